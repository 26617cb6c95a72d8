use crate::record::RawRecord;
use serde_json::Value;
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, warn};

/// Synthetic key holding the lower-cased entry type
pub const ENTRY_TYPE_KEY: &str = "ENTRYTYPE";
/// Synthetic key holding the citation key
pub const CITATION_KEY: &str = "ID";

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("Failed to read file: {0}")]
    IoError(#[from] std::io::Error),
}

/// Read a .bib file and parse every well-formed entry
pub fn parse_bib_file(path: &Path) -> Result<Vec<RawRecord>, ParseError> {
    let content = fs::read_to_string(path)?;
    Ok(parse_bib_string(&content))
}

/// Parse a BibTeX string into one field map per entry.
///
/// Entries look like `@type{key, name = value, ...}` (parentheses are accepted
/// as entry delimiters too). A value is brace-delimited, quote-delimited or a
/// bare token, optionally joined with `#`. Outer delimiters are removed, nested
/// braces are kept verbatim and whitespace runs collapse to one space.
///
/// Malformed entries (no citation key, no closing delimiter) are skipped with a
/// warning and scanning resumes at the next `@`. A malformed field stops field
/// parsing for its entry but keeps the fields read so far.
pub fn parse_bib_string(content: &str) -> Vec<RawRecord> {
    let mut records = Vec::new();
    let mut pos = 0;

    while let Some(offset) = content[pos..].find('@') {
        let start = pos + offset;
        let mut scanner = Scanner::new(content, start + 1);

        match scanner.entry() {
            Ok(Some(record)) => {
                records.push(record);
                pos = scanner.pos;
            }
            Ok(None) => pos = scanner.pos,
            Err(reason) => {
                let line = content[..start].matches('\n').count() + 1;
                warn!(line, reason, "Skipping malformed bib entry");
                pos = start + 1;
            }
        }
    }

    records
}

struct Scanner<'a> {
    src: &'a str,
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Scanner<'a> {
    fn new(src: &'a str, pos: usize) -> Self {
        Self {
            src,
            bytes: src.as_bytes(),
            pos,
        }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(|b| b.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }

    fn identifier(&mut self) -> &'a str {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|b| b.is_ascii_alphanumeric() || matches!(b, b'_' | b'-' | b':' | b'.'))
        {
            self.pos += 1;
        }
        &self.src[start..self.pos]
    }

    /// Parse one entry starting right after its `@`.
    ///
    /// Returns `Ok(None)` for `@comment`, `@preamble` and `@string` blocks.
    fn entry(&mut self) -> Result<Option<RawRecord>, &'static str> {
        let entry_type = self.identifier().to_lowercase();
        if entry_type.is_empty() {
            return Err("missing entry type");
        }

        self.skip_whitespace();
        let close = match self.peek() {
            Some(b'{') => b'}',
            Some(b'(') => b')',
            _ => return Err("missing opening delimiter"),
        };
        let body_start = self.pos + 1;
        let body_end = self
            .entry_end(body_start, close)
            .ok_or("no closing delimiter")?;
        self.pos = body_end + 1;

        if matches!(entry_type.as_str(), "comment" | "preamble" | "string") {
            debug!(entry_type = %entry_type, "Skipping non-entry block");
            return Ok(None);
        }

        let body = &self.src[body_start..body_end];
        let (key, fields) = match body.find(',') {
            Some(comma) => (body[..comma].trim(), &body[comma + 1..]),
            None => (body.trim(), ""),
        };
        if key.is_empty() || key.contains('=') {
            return Err("missing citation key");
        }

        let mut record = parse_fields(fields);
        record.insert(ENTRY_TYPE_KEY.to_string(), Value::String(entry_type));
        record.insert(CITATION_KEY.to_string(), Value::String(key.to_string()));
        Ok(Some(record))
    }

    /// Index of the delimiter closing an entry whose body starts at `from`.
    ///
    /// Quoted values outside braces are skipped whole, so a `)` or `}` inside
    /// them does not end the entry.
    fn entry_end(&self, from: usize, close: u8) -> Option<usize> {
        let mut depth = 0usize;
        let mut i = from;
        while let Some(&b) = self.bytes.get(i) {
            match b {
                b'{' => depth += 1,
                b'}' if depth > 0 => depth -= 1,
                b'"' if depth == 0 => i = self.quote_end(i + 1)?,
                _ if b == close && depth == 0 => return Some(i),
                _ => {}
            }
            i += 1;
        }
        None
    }

    /// Index of the `"` closing a string whose contents start at `from`
    fn quote_end(&self, from: usize) -> Option<usize> {
        let mut depth = 0usize;
        let mut i = from;
        while let Some(&b) = self.bytes.get(i) {
            match b {
                b'\\' => i += 1,
                b'{' => depth += 1,
                b'}' => depth = depth.saturating_sub(1),
                b'"' if depth == 0 => return Some(i),
                _ => {}
            }
            i += 1;
        }
        None
    }
}

fn parse_fields(body: &str) -> RawRecord {
    let mut record = RawRecord::new();
    let mut scanner = Scanner::new(body, 0);

    loop {
        scanner.skip_whitespace();
        while scanner.peek() == Some(b',') {
            scanner.pos += 1;
            scanner.skip_whitespace();
        }
        if scanner.peek().is_none() {
            break;
        }

        let name = scanner.identifier().to_lowercase();
        scanner.skip_whitespace();
        if name.is_empty() || scanner.peek() != Some(b'=') {
            debug!(field = %name, "Malformed field, ignoring rest of entry");
            break;
        }
        scanner.pos += 1;

        let Some(value) = scanner.value() else {
            debug!(field = %name, "Unterminated field value, ignoring rest of entry");
            break;
        };
        record
            .entry(name)
            .or_insert_with(|| Value::String(collapse_whitespace(&value)));
    }

    record
}

impl Scanner<'_> {
    /// Parse a value made of one or more `#`-joined parts.
    fn value(&mut self) -> Option<String> {
        let mut value = String::new();
        loop {
            self.skip_whitespace();
            match self.peek() {
                Some(b'{') => value.push_str(self.braced()?),
                Some(b'"') => value.push_str(self.quoted()?),
                Some(_) => value.push_str(self.bare()),
                None => return None,
            }
            self.skip_whitespace();
            if self.peek() == Some(b'#') {
                self.pos += 1;
            } else {
                return Some(value);
            }
        }
    }

    /// Contents of a `{...}` group, inner braces included
    fn braced(&mut self) -> Option<&str> {
        let start = self.pos + 1;
        let mut depth = 0usize;
        while let Some(b) = self.peek() {
            match b {
                b'{' => depth += 1,
                b'}' => {
                    depth -= 1;
                    if depth == 0 {
                        self.pos += 1;
                        return Some(&self.src[start..self.pos - 1]);
                    }
                }
                _ => {}
            }
            self.pos += 1;
        }
        None
    }

    /// Contents of a `"..."` string; braces inside may protect quotes
    fn quoted(&mut self) -> Option<&str> {
        self.pos += 1;
        let start = self.pos;
        let mut depth = 0usize;
        while let Some(b) = self.peek() {
            match b {
                b'\\' => self.pos += 1,
                b'{' => depth += 1,
                b'}' => depth = depth.saturating_sub(1),
                b'"' if depth == 0 => {
                    self.pos += 1;
                    return Some(&self.src[start..self.pos - 1]);
                }
                _ => {}
            }
            self.pos += 1;
        }
        None
    }

    /// A bare token (number or macro name) up to the next `,` or `#`
    fn bare(&mut self) -> &str {
        let start = self.pos;
        while self.peek().is_some_and(|b| b != b',' && b != b'#') {
            self.pos += 1;
        }
        self.src[start..self.pos].trim()
    }
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn get<'a>(record: &'a RawRecord, key: &str) -> Option<&'a str> {
        record.get(key).and_then(Value::as_str)
    }

    #[test]
    fn test_parse_simple_bib() {
        let bib = r#"
            @article{smith2021,
                author = {John Smith and Jane Doe},
                Title = {A Great Paper},
                journal = "Nature",
                year = 2021,
                doi = {10.1234/example}
            }
        "#;

        let entries = parse_bib_string(bib);
        assert_eq!(entries.len(), 1);
        assert_eq!(get(&entries[0], CITATION_KEY), Some("smith2021"));
        assert_eq!(get(&entries[0], ENTRY_TYPE_KEY), Some("article"));
        assert_eq!(get(&entries[0], "title"), Some("A Great Paper"));
        assert_eq!(get(&entries[0], "journal"), Some("Nature"));
        assert_eq!(get(&entries[0], "year"), Some("2021"));
        assert_eq!(get(&entries[0], "doi"), Some("10.1234/example"));
    }

    #[test]
    fn test_nested_braces_preserved() {
        let bib = "@article{k, title = {The {MDS} conjecture for {P}^2}, year = {2019}}";
        let entries = parse_bib_string(bib);
        assert_eq!(get(&entries[0], "title"), Some("The {MDS} conjecture for {P}^2"));
        assert_eq!(get(&entries[0], "year"), Some("2019"));
    }

    #[test]
    fn test_whitespace_collapsed() {
        let bib = "@book{k, title = {Cox   rings\n\t and   blow-ups}}";
        let entries = parse_bib_string(bib);
        assert_eq!(get(&entries[0], "title"), Some("Cox rings and blow-ups"));
    }

    #[test]
    fn test_quoted_value_with_braced_quote() {
        let bib = r#"@misc{k, note = "He said {"}hi{"}, ok", year = 2001}"#;
        let entries = parse_bib_string(bib);
        assert_eq!(get(&entries[0], "note"), Some(r#"He said {"}hi{"}, ok"#));
        assert_eq!(get(&entries[0], "year"), Some("2001"));
    }

    #[test]
    fn test_concatenation() {
        let bib = r#"@misc{k, title = "Part one " # {and two}}"#;
        let entries = parse_bib_string(bib);
        assert_eq!(get(&entries[0], "title"), Some("Part one and two"));
    }

    #[test]
    fn test_parenthesis_delimiters() {
        let bib = "@article(k, title = {Round})";
        let entries = parse_bib_string(bib);
        assert_eq!(get(&entries[0], "title"), Some("Round"));
    }

    #[test]
    fn test_parenthesis_in_quoted_value() {
        let bib = r#"@article(k, title = "A (b) c", year = 2000)"#;
        let entries = parse_bib_string(bib);
        assert_eq!(entries.len(), 1);
        assert_eq!(get(&entries[0], "title"), Some("A (b) c"));
        assert_eq!(get(&entries[0], "year"), Some("2000"));
    }

    #[test]
    fn test_closing_brace_in_quoted_value() {
        let bib = r#"@misc{k, note = "smile :}", year = 2003}"#;
        let entries = parse_bib_string(bib);
        assert_eq!(get(&entries[0], "note"), Some("smile :}"));
        assert_eq!(get(&entries[0], "year"), Some("2003"));
    }

    #[test]
    fn test_skips_entry_without_key() {
        let bib = r#"
            @article{title = {No key here}}
            @article{good, title = {Kept}}
        "#;
        let entries = parse_bib_string(bib);
        assert_eq!(entries.len(), 1);
        assert_eq!(get(&entries[0], "title"), Some("Kept"));
    }

    #[test]
    fn test_skips_unterminated_entry() {
        let bib = r#"
            @article{broken, title = {Never closed},
            @article{good, title = {Kept}}
        "#;
        let entries = parse_bib_string(bib);
        assert_eq!(entries.len(), 1);
        assert_eq!(get(&entries[0], CITATION_KEY), Some("good"));
    }

    #[test]
    fn test_skips_comments_and_strings() {
        let bib = r#"
            @comment{ignore me}
            @string{jams = {J. Amer. Math. Soc.}}
            @preamble{"\newcommand{\x}{y}"}
            @article{a, title = {Real}}
        "#;
        let entries = parse_bib_string(bib);
        assert_eq!(entries.len(), 1);
        assert_eq!(get(&entries[0], "title"), Some("Real"));
    }

    #[test]
    fn test_malformed_field_keeps_earlier_fields() {
        let bib = "@article{k, title = {Kept}, garbage without equals, year = 2000}";
        let entries = parse_bib_string(bib);
        assert_eq!(entries.len(), 1);
        assert_eq!(get(&entries[0], "title"), Some("Kept"));
        assert_eq!(get(&entries[0], "year"), None);
    }

    #[test]
    fn test_first_duplicate_field_wins() {
        let bib = "@article{k, year = 2000, year = 2001}";
        let entries = parse_bib_string(bib);
        assert_eq!(get(&entries[0], "year"), Some("2000"));
    }

    #[test]
    fn test_parse_missing_file() {
        let err = parse_bib_file(Path::new("/definitely/not/here.bib")).unwrap_err();
        let ParseError::IoError(io) = err;
        assert_eq!(io.kind(), std::io::ErrorKind::NotFound);
    }
}
