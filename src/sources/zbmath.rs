use super::{async_trait, fetch_json, http_client, Source, SourceError};
use crate::identity::AuthorIdentity;
use crate::record::{lookup, resolve_url, value_str, year_from, CanonicalRecord, RawRecord};
use crate::SiteConfig;
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, warn};

const ZBMATH_API_BASE: &str = "https://api.zbmath.org/v1/document/_structured_search";
const ZBMATH_DOCUMENT_BASE: &str = "https://zbmath.org/?q=an:";

/// Keys that have carried the result list in zbMATH responses, in probing order
const RESULT_KEYS: [&str; 6] = ["result", "results", "documents", "items", "hits", "data"];

/// zbMATH Open document search by author
pub struct ZbMathSource {
    client: Client,
    author_query: String,
    rows: usize,
}

impl ZbMathSource {
    pub fn new(config: &SiteConfig) -> Result<Self, SourceError> {
        Ok(Self {
            client: http_client(&config.user_agent())?,
            author_query: config.identity.inverted_name(),
            rows: config.rows,
        })
    }
}

/// Locate the result list without assuming one envelope shape.
///
/// A key holding an object is searched one level deeper (`hits.hits`).
/// No known key means no results.
fn find_results(payload: Value) -> Result<Vec<RawRecord>, SourceError> {
    let list = match payload {
        Value::Array(items) => items,
        Value::Object(mut root) => {
            let mut found = None;
            for key in RESULT_KEYS {
                match root.remove(key) {
                    Some(Value::Array(items)) => {
                        found = Some(items);
                        break;
                    }
                    Some(Value::Object(mut inner)) => {
                        if let Some(items) = RESULT_KEYS.iter().find_map(|k| match inner.remove(*k) {
                            Some(Value::Array(items)) => Some(items),
                            _ => None,
                        }) {
                            found = Some(items);
                            break;
                        }
                    }
                    _ => {}
                }
            }
            found.unwrap_or_else(|| {
                warn!("zbMATH response carried no known result key, treating as empty");
                Vec::new()
            })
        }
        _ => {
            return Err(SourceError::Malformed(
                "zbMATH response is neither an object nor an array".to_string(),
            ))
        }
    };

    Ok(list
        .into_iter()
        .filter_map(|item| match item {
            Value::Object(map) => Some(map),
            _ => None,
        })
        .collect())
}

fn text_at(root: &Value, paths: &[&str]) -> String {
    paths
        .iter()
        .filter_map(|p| lookup(root, p))
        .find_map(value_str)
        .unwrap_or_default()
}

fn author_list(root: &Value) -> &[Value] {
    ["contributors.authors", "authors", "author"]
        .iter()
        .filter_map(|p| lookup(root, p))
        .find_map(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
}

fn author_name(author: &Value) -> String {
    match author {
        Value::String(s) => s.trim().to_string(),
        Value::Object(_) => {
            let given = author.get("given").and_then(Value::as_str).unwrap_or("").trim();
            let family = author.get("family").and_then(Value::as_str).unwrap_or("").trim();
            if !family.is_empty() {
                format!("{} {}", given, family).trim().to_string()
            } else {
                author
                    .get("name")
                    .and_then(Value::as_str)
                    .unwrap_or("")
                    .trim()
                    .to_string()
            }
        }
        _ => String::new(),
    }
}

fn doi_of(root: &Value) -> String {
    let direct = text_at(root, &["doi", "DOI"]);
    if !direct.is_empty() {
        return direct;
    }
    root.get("links")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter(|link| link.get("type").and_then(Value::as_str) == Some("doi"))
        .find_map(|link| link.get("identifier").and_then(value_str))
        .unwrap_or_default()
}

#[async_trait]
impl Source for ZbMathSource {
    async fn fetch_records(&self) -> Result<Vec<RawRecord>, SourceError> {
        let rows = self.rows.to_string();
        let request = self.client.get(ZBMATH_API_BASE).query(&[
            ("au", self.author_query.as_str()),
            ("page", "0"),
            ("results_per_page", rows.as_str()),
            ("sort", "year:desc"),
        ]);

        let payload = fetch_json(request, self.name()).await?;
        let records = find_results(payload)?;
        debug!(count = records.len(), "zbMATH returned documents");
        Ok(records)
    }

    fn matches_author(&self, record: &RawRecord, identity: &AuthorIdentity) -> bool {
        let root = Value::Object(record.clone());
        author_list(&root).iter().any(|author| match author {
            Value::String(name) => identity.appears_in(name),
            Value::Object(_) => {
                identity.matches_author_object(author)
                    || author
                        .get("name")
                        .and_then(Value::as_str)
                        .is_some_and(|name| identity.appears_in(name))
            }
            _ => false,
        })
    }

    fn to_canonical(&self, record: &RawRecord) -> CanonicalRecord {
        let root = Value::Object(record.clone());

        let provider_id = text_at(&root, &["identifier", "id"]);
        let provider_url = if provider_id.is_empty() {
            String::new()
        } else {
            format!("{}{}", ZBMATH_DOCUMENT_BASE, urlencoding::encode(&provider_id))
        };
        let doi = doi_of(&root);
        let year = year_from(
            root.get("year"),
            ["date", "source.series.0.year"]
                .iter()
                .find_map(|p| lookup(&root, p)),
        );

        CanonicalRecord {
            title: text_at(&root, &["title.title", "title"]),
            authors: author_list(&root)
                .iter()
                .map(author_name)
                .filter(|n| !n.is_empty())
                .collect(),
            year,
            journal_name: text_at(
                &root,
                &["source.series.0.title", "journal.title", "journal_title", "journal"],
            ),
            volume: text_at(&root, &["source.series.0.volume", "volume"]),
            issue: text_at(&root, &["source.series.0.issue", "issue"]),
            pages: text_at(&root, &["source.pages", "pages"]),
            url: resolve_url(&text_at(&root, &["url"]), &doi, &provider_url),
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
        "zbMATH"
    }
}
