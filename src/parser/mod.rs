pub mod anchor;
pub mod assemble;
pub mod extract;
pub mod lines;
pub mod pages;
pub mod resolve;
pub mod sections;

use tracing::warn;

use crate::config::EngineConfig;
use crate::error::ExtractError;
use crate::record::CrashRecord;
use extract::Layout;
use lines::LineStream;
use resolve::FieldMiss;

/// One report as plain text, one string per page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDocument {
    pub source_ref: String,
    pub pages: Vec<String>,
}

impl SourceDocument {
    /// Pages separated by form feeds, as written by `pdftotext`.
    pub fn from_text(source_ref: impl Into<String>, text: &str) -> Self {
        Self {
            source_ref: source_ref.into(),
            pages: lines::split_pages(text).into_iter().map(str::to_string).collect(),
        }
    }
}

/// Everything that went missing or looked wrong while extracting one document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostics {
    pub source_ref: String,
    pub misses: Vec<FieldMiss>,
    pub warnings: Vec<String>,
}

impl Diagnostics {
    pub fn new(source_ref: &str) -> Self {
        Self {
            source_ref: source_ref.to_string(),
            ..Default::default()
        }
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        warn!(source = %self.source_ref, "{}", message);
        self.warnings.push(message);
    }
}

pub struct Extraction {
    pub record: CrashRecord,
    pub layout: Layout,
    pub diagnostics: Diagnostics,
}

/// Three-pass pipeline: text → classified pages and sections → resolved fields → record.
pub fn process_document(doc: &SourceDocument, config: &EngineConfig) -> Result<Extraction, ExtractError> {
    let stream = LineStream::build(&doc.source_ref, &doc.pages)?;
    let mut diagnostics = Diagnostics::new(&doc.source_ref);

    let data = extract::extract_all(&stream, &config.calibration, &mut diagnostics);
    let record = assemble::assemble(
        data.crash,
        data.vehicles,
        &config.jurisdiction,
        &doc.source_ref,
        &mut diagnostics,
    );

    Ok(Extraction {
        record,
        layout: data.layout,
        diagnostics,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> SourceDocument {
        let text = std::fs::read_to_string("tests/fixtures/oh1_two_units.txt").unwrap();
        SourceDocument::from_text("tests/fixtures/oh1_two_units.txt", &text)
    }

    #[test]
    fn empty_document_fails() {
        let doc = SourceDocument::from_text("blank.txt", "\n  \n\u{0C}\n");
        let err = process_document(&doc, &EngineConfig::default()).err();
        assert_eq!(
            err,
            Some(ExtractError::EmptyDocument {
                source_ref: "blank.txt".into()
            })
        );
    }

    #[test]
    fn fixture_record() {
        let out = process_document(&fixture(), &EngineConfig::default()).unwrap();
        let r = &out.record;
        assert_eq!(r.fields.report_number, "P25102200000570");
        assert_eq!(r.fields.date_of_crash, "2025-10-22");
        assert_eq!(r.fields.county, "DELAWARE");
        assert_eq!(r.fields.total_vehicles, "2");
        assert_eq!(r.fields.pdf_file_path, "tests/fixtures/oh1_two_units.txt");
        assert_eq!(r.vehicles.len(), 2);
        assert_eq!(r.vehicles[0].persons[0].fields.date_of_birth, "1988-04-17");
        assert_eq!(r.vehicles[1].persons.len(), 2);
        assert!(out.diagnostics.warnings.is_empty());
    }

    #[test]
    fn extraction_is_idempotent() {
        let doc = fixture();
        let cfg = EngineConfig::default();
        let a = serde_json::to_string(&process_document(&doc, &cfg).unwrap().record).unwrap();
        let b = serde_json::to_string(&process_document(&doc, &cfg).unwrap().record).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn persons_lie_in_a_vehicle_bound() {
        let doc = fixture();
        let out = process_document(&doc, &EngineConfig::default()).unwrap();
        let spill = sections::spill_bounds(&out.layout.vehicles, usize::MAX);
        for p in &out.layout.persons {
            assert!(spill.iter().any(|b| b.contains(&p.anchor)));
        }
    }
}
