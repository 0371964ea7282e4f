use thiserror::Error;

/// Failures that prevent a record from being produced at all.
///
/// Missing fields and missing sections are never errors; they degrade to
/// fallback values and diagnostics instead.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExtractError {
    #[error("no text lines extracted from {source_ref}")]
    EmptyDocument { source_ref: String },
}
