use super::{async_trait, fetch_json, http_client, Source, SourceError};
use crate::identity::AuthorIdentity;
use crate::record::{field, lookup, resolve_url, year_from, CanonicalRecord, RawRecord};
use crate::SiteConfig;
use reqwest::Client;
use serde_json::Value;
use tracing::debug;

const CROSSREF_API_BASE: &str = "https://api.crossref.org/works";
const SELECT_FIELDS: &str = "title,author,DOI,URL,issued,container-title,volume,issue,page";

/// Crossref works search, constrained by author name and sorted by issue date
pub struct CrossRefSource {
    client: Client,
    author_query: String,
    rows: usize,
}

impl CrossRefSource {
    pub fn new(config: &SiteConfig) -> Result<Self, SourceError> {
        Ok(Self {
            client: http_client(&config.user_agent())?,
            author_query: config.identity.display_name(),
            rows: config.rows,
        })
    }
}

/// Records live under `message.items`; a missing list means no results.
fn parse_works(payload: Value) -> Result<Vec<RawRecord>, SourceError> {
    let Value::Object(mut root) = payload else {
        return Err(SourceError::Malformed(
            "Crossref response is not a JSON object".to_string(),
        ));
    };

    let items = match root.remove("message") {
        Some(Value::Object(mut message)) => message.remove("items"),
        _ => None,
    };

    Ok(match items {
        Some(Value::Array(items)) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::Object(map) => Some(map),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    })
}

fn author_name(author: &Value) -> String {
    if let Some(name) = author.get("name").and_then(Value::as_str) {
        return name.trim().to_string();
    }
    ["given", "family"]
        .iter()
        .filter_map(|k| author.get(*k).and_then(Value::as_str))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn authors(record: &RawRecord) -> &[Value] {
    record
        .get("author")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
}

#[async_trait]
impl Source for CrossRefSource {
    async fn fetch_records(&self) -> Result<Vec<RawRecord>, SourceError> {
        let rows = self.rows.to_string();
        let request = self.client.get(CROSSREF_API_BASE).query(&[
            ("query.author", self.author_query.as_str()),
            ("rows", rows.as_str()),
            ("sort", "issued"),
            ("order", "desc"),
            ("select", SELECT_FIELDS),
        ]);

        let payload = fetch_json(request, self.name()).await?;
        let records = parse_works(payload)?;
        debug!(count = records.len(), "Crossref returned works");
        Ok(records)
    }

    fn matches_author(&self, record: &RawRecord, identity: &AuthorIdentity) -> bool {
        authors(record)
            .iter()
            .any(|a| identity.matches_author_object(a))
    }

    fn to_canonical(&self, record: &RawRecord) -> CanonicalRecord {
        let root = Value::Object(record.clone());
        // Undated works carry `"date-parts": [[null]]`, so keep looking past them.
        let year = ["issued", "published-print", "published-online"]
            .iter()
            .map(|k| year_from(lookup(&root, &format!("{}.date-parts.0.0", k)), None))
            .find(|y| !y.is_empty())
            .unwrap_or_default();

        let doi = field(record, "DOI");
        let url = resolve_url(&field(record, "URL"), &doi, "");

        CanonicalRecord {
            title: field(record, "title"),
            authors: authors(record)
                .iter()
                .map(author_name)
                .filter(|n| !n.is_empty())
                .collect(),
            year,
            journal_name: field(record, "container-title"),
            volume: field(record, "volume"),
            issue: field(record, "issue"),
            pages: field(record, "page"),
            doi,
            url,
            ..CanonicalRecord::default()
        }
    }

    fn name(&self) -> &'static str {
        "Crossref"
    }
}
