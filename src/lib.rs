pub mod config;
pub mod error;
pub mod output;
pub mod parser;
pub mod record;

pub use config::EngineConfig;
pub use error::ExtractError;
pub use parser::{process_document, Diagnostics, Extraction, SourceDocument};
pub use record::CrashRecord;
