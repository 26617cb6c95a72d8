pub mod identity;
pub mod page;
pub mod parser;
pub mod record;
pub mod render;
pub mod sources;

use identity::AuthorIdentity;
use page::{fallback_body, write_page, PageError, PageTemplate};
use record::CanonicalRecord;
use render::{CardRenderer, MR_LOOKUP_BASE};
use sources::{Source, SourceError};

use std::path::PathBuf;
use tracing::{debug, error, info};

/// Configuration for one page build
pub struct SiteConfig {
    /// Author whose publications are listed
    pub identity: AuthorIdentity,
    /// Maximum number of records requested from remote sources
    pub rows: usize,
    /// Destination of the generated page
    pub output: PathBuf,
    /// Bibliography read by the BibTeX source
    pub bib_path: PathBuf,
    /// Client identifier sent to remote APIs
    pub client_name: String,
    /// Contact address sent alongside the client identifier
    pub contact: String,
    /// Prefix of the per-DOI lookup link
    pub lookup_base: String,
}

impl SiteConfig {
    /// `name (mailto:contact)`, the form Crossref asks polite clients to send
    pub fn user_agent(&self) -> String {
        format!("{} (mailto:{})", self.client_name, self.contact)
    }
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            identity: AuthorIdentity::default(),
            rows: 200,
            output: PathBuf::from("papers/index.html"),
            bib_path: PathBuf::from("data/publications.bib"),
            client_name: "alaface-pages/1.0".to_string(),
            contact: "alaface@udec.cl".to_string(),
            lookup_base: MR_LOOKUP_BASE.to_string(),
        }
    }
}

/// What ended up on the written page
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageOutcome {
    /// The publication list, with this many cards
    Published { records: usize },
    /// The fallback notice, because the source failed
    Fallback { reason: String },
}

/// Runs a source through filtering, normalization and rendering into a page
pub struct PageBuilder<'a> {
    config: &'a SiteConfig,
    template: PageTemplate,
}

impl<'a> PageBuilder<'a> {
    pub fn new(config: &'a SiteConfig) -> Self {
        Self {
            config,
            template: PageTemplate::new(&config.identity),
        }
    }

    /// Build and write the page; source failures produce the fallback page.
    ///
    /// Only a failure to write the output file is returned as an error.
    pub async fn build(&self, source: &dyn Source) -> Result<PageOutcome, PageError> {
        info!(source = source.name(), "Fetching records");

        match self.collect(source).await {
            Ok(records) => {
                let renderer = CardRenderer::new(&self.config.lookup_base, source.provider_label());
                let body = renderer.render_all(&records, source.name());
                self.write(source.name(), &body)?;
                info!(
                    count = records.len(),
                    path = %self.config.output.display(),
                    "Generated publications page"
                );
                Ok(PageOutcome::Published {
                    records: records.len(),
                })
            }
            Err(e) => self.write_fallback(source.name(), &e),
        }
    }

    /// Write the fallback page for a source that could not be read
    pub fn write_fallback(
        &self,
        source_name: &str,
        cause: &SourceError,
    ) -> Result<PageOutcome, PageError> {
        error!(source = source_name, error = %cause, "Build failed, writing fallback page");
        self.write(source_name, &fallback_body(source_name))?;
        Ok(PageOutcome::Fallback {
            reason: cause.to_string(),
        })
    }

    /// Fetch, filter to the configured author, normalize and order records
    async fn collect(&self, source: &dyn Source) -> Result<Vec<CanonicalRecord>, SourceError> {
        let raw = source.fetch_records().await?;
        let total = raw.len();

        let mut records: Vec<CanonicalRecord> = raw
            .iter()
            .filter(|r| source.matches_author(r, &self.config.identity))
            .map(|r| source.to_canonical(r))
            .collect();
        debug!(
            total,
            kept = records.len(),
            "Filtered records by author identity"
        );

        if source.sorts_by_year() {
            sort_by_year_desc(&mut records);
        }
        Ok(records)
    }

    fn write(&self, source_name: &str, body: &str) -> Result<(), PageError> {
        let html = self.template.assemble(source_name, body);
        write_page(&self.config.output, &html)
    }
}

/// Newest first; records without a year go last, ties keep arrival order.
pub fn sort_by_year_desc(records: &mut [CanonicalRecord]) {
    records.sort_by(|a, b| b.year_number().cmp(&a.year_number()));
}
