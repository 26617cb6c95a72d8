use serde_json::Value;

/// The author whose publications the page lists
#[derive(Debug, Clone)]
pub struct AuthorIdentity {
    pub given: String,
    pub family: String,
    /// Bare ORCID iD, e.g. `0000-0001-6926-8249`
    pub orcid: Option<String>,
    /// Extra spellings accepted by free-text matching
    pub aliases: Vec<String>,
}

impl AuthorIdentity {
    pub fn new(given: impl Into<String>, family: impl Into<String>) -> Self {
        Self {
            given: given.into(),
            family: family.into(),
            orcid: None,
            aliases: Vec::new(),
        }
    }

    pub fn with_orcid(mut self, orcid: impl Into<String>) -> Self {
        self.orcid = Some(strip_orcid_prefix(&orcid.into()).to_string());
        self
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    /// "Given Family"
    pub fn display_name(&self) -> String {
        format!("{} {}", self.given.trim(), self.family.trim())
            .trim()
            .to_string()
    }

    /// "Family, Given", the form bibliographic databases index by
    pub fn inverted_name(&self) -> String {
        format!("{}, {}", self.family.trim(), self.given.trim())
    }

    /// Exact ORCID comparison after dropping any `orcid.org` URL prefix
    pub fn matches_orcid(&self, candidate: &str) -> bool {
        match &self.orcid {
            Some(orcid) if !orcid.is_empty() => strip_orcid_prefix(candidate.trim()) == orcid,
            _ => false,
        }
    }

    /// Case-insensitive exact match on both name parts
    pub fn matches_name(&self, given: &str, family: &str) -> bool {
        !self.family.trim().is_empty()
            && given.trim().to_lowercase() == self.given.trim().to_lowercase()
            && family.trim().to_lowercase() == self.family.trim().to_lowercase()
    }

    /// Case-insensitive substring match of any known name variant
    pub fn appears_in(&self, text: &str) -> bool {
        let haystack = collapse_whitespace(text).to_lowercase();
        self.name_variants()
            .iter()
            .map(|v| collapse_whitespace(v).to_lowercase())
            .filter(|v| !v.is_empty())
            .any(|needle| haystack.contains(&needle))
    }

    fn name_variants(&self) -> Vec<String> {
        let mut variants = Vec::new();
        if !self.family.trim().is_empty() {
            variants.push(self.display_name());
            variants.push(self.inverted_name());
        }
        variants.extend(self.aliases.iter().cloned());
        variants
    }

    /// Structured author check used by the JSON sources: ORCID, then given+family.
    pub fn matches_author_object(&self, author: &Value) -> bool {
        let text = |key: &str| author.get(key).and_then(Value::as_str).unwrap_or("");

        let orcid = if text("ORCID").is_empty() {
            text("orcid")
        } else {
            text("ORCID")
        };
        if self.matches_orcid(orcid) {
            return true;
        }

        self.matches_name(text("given"), text("family"))
    }
}

impl Default for AuthorIdentity {
    fn default() -> Self {
        AuthorIdentity::new("Antonio", "Laface").with_orcid("0000-0001-6926-8249")
    }
}

/// Remove a leading `http(s)://orcid.org/`
pub fn strip_orcid_prefix(s: &str) -> &str {
    ["https://orcid.org/", "http://orcid.org/"]
        .iter()
        .find_map(|prefix| s.strip_prefix(prefix))
        .unwrap_or(s)
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_name_match_is_case_insensitive() {
        let me = AuthorIdentity::default();
        assert!(me.matches_name("ANTONIO", "LAFACE"));
        assert!(me.matches_name(" antonio ", "laface"));
        assert!(!me.matches_name("Antonio", "Rossi"));
        assert!(!me.matches_name("", "Laface"));
    }

    #[test]
    fn test_substring_match() {
        let me = AuthorIdentity::default();
        assert!(me.appears_in("ANTONIO LAFACE"));
        assert!(me.appears_in("Ugolini, Luca and antonio   laface"));
        assert!(me.appears_in("Laface, Antonio and Ugolini, Luca"));
        assert!(!me.appears_in("Luca Ugolini"));
        assert!(!me.appears_in(""));
    }

    #[test]
    fn test_aliases_extend_substring_match() {
        let me = AuthorIdentity::default().with_alias("A. Laface");
        assert!(me.appears_in("Hausen, J. and A. Laface"));
    }

    #[test]
    fn test_orcid_match_strips_url_prefix() {
        let me = AuthorIdentity::default();
        assert!(me.matches_orcid("https://orcid.org/0000-0001-6926-8249"));
        assert!(me.matches_orcid("http://orcid.org/0000-0001-6926-8249"));
        assert!(me.matches_orcid("0000-0001-6926-8249"));
        assert!(!me.matches_orcid("https://orcid.org/0000-0002-0000-0000"));

        let anonymous = AuthorIdentity::new("Antonio", "Laface");
        assert!(!anonymous.matches_orcid(""));
    }

    #[test]
    fn test_author_object() {
        let me = AuthorIdentity::default();
        assert!(me.matches_author_object(&json!({
            "given": "Someone", "family": "Else",
            "ORCID": "http://orcid.org/0000-0001-6926-8249"
        })));
        assert!(me.matches_author_object(&json!({"given": "antonio", "family": "LAFACE"})));
        assert!(!me.matches_author_object(&json!({"given": "Luca", "family": "Ugolini"})));
        assert!(!me.matches_author_object(&json!("Antonio Laface")));
    }
}
