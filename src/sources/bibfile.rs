use super::{async_trait, Source, SourceError};
use crate::identity::AuthorIdentity;
use crate::parser::{parse_bib_file, ParseError};
use crate::record::{field, first_field, resolve_url, year_from, CanonicalRecord, RawRecord};
use std::io::ErrorKind;
use std::path::PathBuf;
use tracing::debug;

const ZBMATH_DOCUMENT_BASE: &str = "https://zbmath.org/?q=an:";

/// A local BibTeX bibliography
pub struct BibFileSource {
    path: PathBuf,
}

impl BibFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl Source for BibFileSource {
    async fn fetch_records(&self) -> Result<Vec<RawRecord>, SourceError> {
        let records = parse_bib_file(&self.path).map_err(|e| match e {
            ParseError::IoError(io) if io.kind() == ErrorKind::NotFound => {
                SourceError::Missing(self.path.display().to_string())
            }
            ParseError::IoError(io) => {
                SourceError::Malformed(format!("{}: {}", self.path.display(), io))
            }
        })?;
        debug!(count = records.len(), path = %self.path.display(), "Parsed bibliography");
        Ok(records)
    }

    fn matches_author(&self, record: &RawRecord, identity: &AuthorIdentity) -> bool {
        identity.appears_in(&field(record, "author"))
    }

    fn to_canonical(&self, record: &RawRecord) -> CanonicalRecord {
        let doi = field(record, "doi");
        let provider_id = field(record, "zbl");
        let provider_url = if provider_id.is_empty() {
            String::new()
        } else {
            format!("{}{}", ZBMATH_DOCUMENT_BASE, urlencoding::encode(&provider_id))
        };
        let author = field(record, "author");

        CanonicalRecord {
            title: field(record, "title"),
            authors: if author.is_empty() { Vec::new() } else { vec![author] },
            year: year_from(record.get("year"), record.get("date")),
            journal_name: first_field(record, &["journal", "booktitle"]),
            volume: field(record, "volume"),
            issue: field(record, "number"),
            pages: field(record, "pages"),
            url: resolve_url(&field(record, "url"), &doi, &provider_url),
            doi,
            provider_id,
            provider_url,
        }
    }

    fn sorts_by_year(&self) -> bool {
        true
    }

    fn provider_label(&self) -> Option<&'static str> {
        Some("zbMATH")
    }

    fn name(&self) -> &'static str {
        "BibTeX"
    }
}
