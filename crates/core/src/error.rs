use thiserror::Error;

/// Fatal startup problems. The server must not serve requests with any of these.
#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("{key} is not set (required by LLM provider '{provider}')")]
    MissingCredential { provider: String, key: &'static str },

    #[error("unknown {kind} provider: '{name}'")]
    UnknownProvider { kind: &'static str, name: String },

    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}
