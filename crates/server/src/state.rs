use parentkb_ingest::PdfCollection;
use parentkb_rag::QaService;

pub const SERVICE_NAME: &str = "Parent Dashboard AI Assistant";

pub struct AppState {
    pub qa: QaService,
    /// The same directory the pipeline loads from.
    pub pdfs: PdfCollection,
}
