use crate::record::{doi_url, is_web_url, CanonicalRecord};

/// MathSciNet relay that resolves a DOI to its MR review
pub const MR_LOOKUP_BASE: &str = "https://mathscinet.ams.org/mathscinet/relay?mr=Lookup&url=https://mathscinet.ams.org/mathscinet/search/publications.html?pg1=DOI&s1=";

/// Escape text for use in HTML content and double-quoted attributes
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Turns canonical records into publication cards
pub struct CardRenderer {
    lookup_base: String,
    provider_label: Option<&'static str>,
}

impl CardRenderer {
    pub fn new(lookup_base: impl Into<String>, provider_label: Option<&'static str>) -> Self {
        Self {
            lookup_base: lookup_base.into(),
            provider_label,
        }
    }

    /// Lookup-service URL for a DOI, or empty
    pub fn lookup_url(&self, doi: &str) -> String {
        if doi.is_empty() {
            String::new()
        } else {
            format!("{}{}", self.lookup_base, urlencoding::encode(doi))
        }
    }

    /// Render one record as a card
    pub fn render(&self, record: &CanonicalRecord) -> String {
        let title = escape_html(record.display_title());
        let heading = if is_web_url(&record.url) {
            external_link(&record.url, &title)
        } else {
            title
        };

        let authors = record
            .authors
            .iter()
            .map(|a| escape_html(a))
            .collect::<Vec<_>>()
            .join(", ");

        let year = if record.year.is_empty() {
            String::new()
        } else {
            format!(" · <strong>Year:</strong> {}", escape_html(&record.year))
        };

        format!(
            r#"
      <div class="card">
        <h3 style="margin-top:0">{heading}</h3>
        <p><strong>Authors:</strong> {authors}</p>
        <p><strong>Journal:</strong> {journal}{tail}{year}</p>
        <p>{links}</p>
      </div>"#,
            journal = escape_html(&record.journal_name),
            tail = escape_html(&record.citation_tail()),
            links = self.links(record),
        )
    }

    fn links(&self, record: &CanonicalRecord) -> String {
        let mut links = Vec::new();
        if !record.doi.is_empty() {
            links.push(format!(
                "DOI: {}",
                external_link(&doi_url(&record.doi), &escape_html(&record.doi))
            ));
            links.push(external_link(&self.lookup_url(&record.doi), "MR lookup"));
        }
        if let Some(label) = self.provider_label {
            if !record.provider_id.is_empty() && is_web_url(&record.provider_url) {
                links.push(external_link(&record.provider_url, label));
            }
        }
        links.join(" · ")
    }

    /// Render every record, or a single notice when there are none
    pub fn render_all(&self, records: &[CanonicalRecord], source_name: &str) -> String {
        if records.is_empty() {
            return format!("<p>No records found via {}.</p>", escape_html(source_name));
        }
        records.iter().map(|r| self.render(r)).collect()
    }
}

/// `text` must already be escaped
fn external_link(href: &str, text: &str) -> String {
    format!(
        r#"<a href="{}" target="_blank" rel="noopener">{}</a>"#,
        escape_html(href),
        text
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn renderer() -> CardRenderer {
        CardRenderer::new(MR_LOOKUP_BASE, Some("zbMATH"))
    }

    fn record() -> CanonicalRecord {
        CanonicalRecord {
            title: "Cox rings".to_string(),
            authors: vec!["Antonio Laface".to_string(), "Luca Ugolini".to_string()],
            year: "2021".to_string(),
            journal_name: "Math. Ann.".to_string(),
            volume: "12".to_string(),
            issue: "3".to_string(),
            pages: "45-50".to_string(),
            doi: "10.1007/abc".to_string(),
            url: "https://doi.org/10.1007%2Fabc".to_string(),
            ..CanonicalRecord::default()
        }
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"<b>"Tom" & 'Jerry'</b>"#),
            "&lt;b&gt;&quot;Tom&quot; &amp; &#39;Jerry&#39;&lt;/b&gt;"
        );
    }

    #[test]
    fn test_render_card() {
        let html = renderer().render(&record());
        assert!(html.contains(r#"<div class="card">"#));
        assert!(html.contains(
            r#"<a href="https://doi.org/10.1007%2Fabc" target="_blank" rel="noopener">Cox rings</a>"#
        ));
        assert!(html.contains("<strong>Authors:</strong> Antonio Laface, Luca Ugolini"));
        assert!(html.contains(
            "<strong>Journal:</strong> Math. Ann. 12(3):45-50 · <strong>Year:</strong> 2021"
        ));
        assert!(html.contains("DOI: <a href=\"https://doi.org/10.1007%2Fabc\""));
        assert!(html.contains(">MR lookup</a>"));
        assert!(html.contains("s1=10.1007%2Fabc"));
        assert!(!html.contains("zbMATH"));
    }

    #[test]
    fn test_untitled_placeholder() {
        let html = renderer().render(&CanonicalRecord::default());
        assert!(html.contains("(untitled)"));
        assert!(html.contains("<strong>Authors:</strong> </p>"));
    }

    #[test]
    fn test_title_without_url_is_plain_text() {
        let mut r = record();
        r.url.clear();
        let html = renderer().render(&r);
        assert!(html.contains(r#"<h3 style="margin-top:0">Cox rings</h3>"#));
    }

    #[test]
    fn test_script_url_is_not_linked() {
        let mut r = record();
        r.url = "javascript:alert(document.cookie)".to_string();
        let html = renderer().render(&r);
        assert!(!html.contains("javascript:"));
        assert!(html.contains(r#"<h3 style="margin-top:0">Cox rings</h3>"#));
    }

    #[test]
    fn test_year_segment_omitted_when_empty() {
        let mut r = record();
        r.year.clear();
        let html = renderer().render(&r);
        assert!(!html.contains("Year:"));
    }

    #[test]
    fn test_no_doi_no_doi_links() {
        let mut r = record();
        r.doi.clear();
        let html = renderer().render(&r);
        assert!(!html.contains("DOI:"));
        assert!(!html.contains("MR lookup"));
    }

    #[test]
    fn test_provider_link() {
        let mut r = record();
        r.provider_id = "1420.14001".to_string();
        r.provider_url = "https://zbmath.org/?q=an:1420.14001".to_string();

        let html = renderer().render(&r);
        assert!(html.contains(
            r#"<a href="https://zbmath.org/?q=an:1420.14001" target="_blank" rel="noopener">zbMATH</a>"#
        ));

        let plain = CardRenderer::new(MR_LOOKUP_BASE, None).render(&r);
        assert!(!plain.contains("zbMATH"));
    }

    #[test]
    fn test_escapes_every_field() {
        let hostile = r#"<script>alert("x&'y")</script>"#;
        let r = CanonicalRecord {
            title: hostile.to_string(),
            authors: vec![hostile.to_string()],
            journal_name: hostile.to_string(),
            volume: hostile.to_string(),
            year: hostile.to_string(),
            url: format!("https://example.org/?q={}", hostile),
            ..CanonicalRecord::default()
        };

        let html = renderer().render(&r);
        assert!(!html.contains("<script>"));
        assert!(!html.contains(r#""x"#));
        assert!(!html.contains("'y"));
        assert!(html.contains("&lt;script&gt;alert(&quot;x&amp;&#39;y&quot;)&lt;/script&gt;"));
    }

    #[test]
    fn test_render_all_empty() {
        let body = renderer().render_all(&[], "Crossref");
        assert_eq!(body, "<p>No records found via Crossref.</p>");
    }

    #[test]
    fn test_render_all_keeps_order() {
        let mut second = record();
        second.title = "Second".to_string();
        let body = renderer().render_all(&[record(), second], "Crossref");
        let first_at = body.find("Cox rings").unwrap();
        let second_at = body.find("Second").unwrap();
        assert!(first_at < second_at);
        assert_eq!(body.matches(r#"<div class="card">"#).count(), 2);
    }
}
