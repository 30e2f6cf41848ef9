//! CLI argument parsing and subcommand dispatch.

use clap::{Parser, Subcommand};
use tracing::info;

use parentkb_core::Config;

use crate::{router, startup};

#[derive(Parser, Debug)]
#[command(
    name = "parentkb-server",
    version,
    about = "Speech-therapy knowledge-base assistant for parents"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Command {
    /// Start the HTTP server (default)
    Serve {
        /// Overrides PORT
        #[arg(long)]
        port: Option<u16>,
    },
    /// Rebuild the vector index from every PDF and exit
    Reindex,
    /// Answer one question on stdout
    Ask {
        question: String,
    },
}

pub async fn run(cli: Cli, mut config: Config) -> anyhow::Result<()> {
    config.log_summary();
    config.validate()?;

    match cli.command.unwrap_or(Command::Serve { port: None }) {
        Command::Serve { port } => {
            if let Some(port) = port {
                config.server.port = port;
            }
            serve(&config).await
        }
        Command::Reindex => {
            let qa = startup::build_qa_service(&config).await?;
            let report = qa.reload_knowledge_base().await?;
            info!(pages = report.pages, chunks = report.chunks, "reindex complete");
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
        Command::Ask { question } => {
            let qa = startup::build_qa_service(&config).await?;
            let answer = qa.answer_question(&question).await?;
            println!("{}", answer.answer);
            if !answer.context.is_empty() {
                println!();
                println!("Sources:");
                for item in &answer.context {
                    match item.page {
                        Some(page) => println!("  {} p.{} ({:.2})", item.source, page, item.score),
                        None => println!("  {} ({:.2})", item.source, item.score),
                    }
                }
            }
            Ok(())
        }
    }
}

async fn serve(config: &Config) -> anyhow::Result<()> {
    let state = startup::build_app_state(config).await?;
    let app = router::build_router(state, &config.server.cors_origin);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Parent dashboard API listening on http://{}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}
