use serde_json::Value;

/// Provider-specific field map, as parsed from a JSON payload or a bib entry
pub type RawRecord = serde_json::Map<String, Value>;

/// Placeholder shown for records without a title
pub const UNTITLED: &str = "(untitled)";

const DOI_RESOLVER: &str = "https://doi.org/";

/// Normalized publication record consumed by the renderer
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CanonicalRecord {
    /// Paper title
    pub title: String,
    /// Author display names, in source order
    pub authors: Vec<String>,
    /// Publication year
    pub year: String,
    /// Journal or proceedings name
    pub journal_name: String,
    pub volume: String,
    pub issue: String,
    pub pages: String,
    /// DOI identifier
    pub doi: String,
    /// Primary link target for the title
    pub url: String,
    /// Provider accession number (e.g. zbMATH "Zbl" number)
    pub provider_id: String,
    /// Provider document page derived from `provider_id`
    pub provider_url: String,
}

impl CanonicalRecord {
    /// Title to display, falling back to the untitled placeholder
    pub fn display_title(&self) -> &str {
        if self.title.trim().is_empty() {
            UNTITLED
        } else {
            &self.title
        }
    }

    /// `volume(issue):pages` suffix for the journal line
    pub fn citation_tail(&self) -> String {
        citation_tail(&self.volume, &self.issue, &self.pages)
    }

    /// Year as a number, for ordering
    pub fn year_number(&self) -> Option<i32> {
        self.year.parse().ok()
    }
}

/// Compose the citation tail; absent parts leave no punctuation behind.
pub fn citation_tail(volume: &str, issue: &str, pages: &str) -> String {
    let mut tail = String::new();
    if !volume.is_empty() {
        tail.push(' ');
        tail.push_str(volume);
    }
    if !issue.is_empty() {
        tail.push('(');
        tail.push_str(issue);
        tail.push(')');
    }
    if !pages.is_empty() {
        tail.push(':');
        tail.push_str(pages);
    }
    tail
}

/// `https://doi.org/<doi>` with the DOI percent-encoded, or empty
pub fn doi_url(doi: &str) -> String {
    if doi.is_empty() {
        String::new()
    } else {
        format!("{}{}", DOI_RESOLVER, urlencoding::encode(doi))
    }
}

/// Whether `url` is an absolute `http` or `https` link
pub fn is_web_url(url: &str) -> bool {
    let lower = url.trim_start().to_ascii_lowercase();
    lower.starts_with("https://") || lower.starts_with("http://")
}

/// Pick the primary link: explicit web URL, then DOI, then provider document.
pub fn resolve_url(explicit: &str, doi: &str, provider_url: &str) -> String {
    if is_web_url(explicit) {
        explicit.to_string()
    } else if !doi.is_empty() {
        doi_url(doi)
    } else {
        provider_url.to_string()
    }
}

/// Extract the first run of exactly four digits from a date-like string
pub fn extract_year(s: &str) -> Option<String> {
    let bytes = s.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i].is_ascii_digit() {
            let start = i;
            while i < bytes.len() && bytes[i].is_ascii_digit() {
                i += 1;
            }
            if i - start == 4 {
                return Some(s[start..i].to_string());
            }
        } else {
            i += 1;
        }
    }
    None
}

/// Year from a direct year value (number or string), else from a date string.
pub fn year_from(direct: Option<&Value>, date: Option<&Value>) -> String {
    if let Some(v) = direct {
        match v {
            Value::Number(n) => {
                // `2019.0` counts as 2019
                if let Some(year) = extract_year(&n.to_string()) {
                    return year;
                }
            }
            Value::String(s) => {
                if let Some(year) = extract_year(s) {
                    return year;
                }
            }
            _ => {}
        }
    }
    date.and_then(value_str)
        .and_then(|d| extract_year(&d))
        .unwrap_or_default()
}

/// Render a scalar JSON value as a trimmed string; arrays yield their first element.
pub fn value_str(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        Value::Array(items) => items.first().and_then(value_str),
        _ => None,
    }
}

/// String value of `key`, or empty
pub fn field(record: &RawRecord, key: &str) -> String {
    record.get(key).and_then(value_str).unwrap_or_default()
}

/// First non-empty string among `keys`
pub fn first_field(record: &RawRecord, keys: &[&str]) -> String {
    keys.iter()
        .map(|k| field(record, k))
        .find(|v| !v.is_empty())
        .unwrap_or_default()
}

/// Follow a path of object keys and array indices written as `a.b.0.c`
pub fn lookup<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(value, |current, segment| match current {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}
