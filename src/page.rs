use crate::identity::AuthorIdentity;
use crate::render::escape_html;
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PageError {
    #[error("Failed to create directory {path}: {source}")]
    CreateDir {
        path: String,
        source: std::io::Error,
    },
    #[error("Failed to write {path}: {source}")]
    Write {
        path: String,
        source: std::io::Error,
    },
}

/// Fixed page chrome around the publication list
pub struct PageTemplate {
    /// Full name shown in the navigation and footer
    pub owner: String,
    /// Short form used in the document title
    pub short_name: String,
    pub orcid: Option<String>,
}

impl PageTemplate {
    pub fn new(identity: &AuthorIdentity) -> Self {
        let initial = identity
            .given
            .trim()
            .chars()
            .next()
            .map(|c| format!("{}. ", c))
            .unwrap_or_default();
        Self {
            owner: identity.display_name(),
            short_name: format!("{}{}", initial, identity.family.trim()),
            orcid: identity.orcid.clone(),
        }
    }

    fn filter_note(&self) -> &'static str {
        if self.orcid.is_some() {
            "filtered by my ORCID"
        } else {
            "filtered by author name"
        }
    }

    pub fn header(&self, source_name: &str) -> String {
        format!(
            r#"<!doctype html>
<html lang="en"><head>
  <meta charset="utf-8"><meta name="viewport" content="width=device-width,initial-scale=1">
  <title>Papers · {short_name}</title>
  <link rel="stylesheet" href="../assets/css/style.css">
</head><body>
<header><nav>
  <a class="brand" href="../">{brand}</a>
  <a href="./">Papers</a>
  <a href="../arxiv/">arXiv</a>
  <a href="../software/">Software</a>
  <a href="../notes/">Lecture notes</a>
  <a href="../book/">Book</a>
</nav></header>
<main>
  <h1>Published papers</h1>
  <p>This page is generated automatically from {source} ({note}).</p>
  <div id="papers" class="card">
"#,
            short_name = escape_html(&self.short_name),
            brand = escape_html(&self.owner).replace(' ', "&nbsp;"),
            source = escape_html(source_name),
            note = self.filter_note(),
        )
    }

    pub fn footer(&self, source_name: &str) -> String {
        let orcid = self
            .orcid
            .as_deref()
            .map(|o| format!(" · ORCID {}", escape_html(o)))
            .unwrap_or_default();
        format!(
            r#"
  </div>
  <p style="font-size:.95em;color:#57606a;margin-top:1rem">Data source: {source}{orcid}</p>
</main>
<footer>© <span id="y"></span> {owner}</footer>
<script>document.getElementById('y').textContent = new Date().getFullYear();</script>
</body></html>"#,
            source = escape_html(source_name),
            owner = escape_html(&self.owner),
        )
    }

    /// Header, body and footer as one document
    pub fn assemble(&self, source_name: &str, body: &str) -> String {
        let mut html = self.header(source_name);
        html.push_str(body);
        html.push_str(&self.footer(source_name));
        html
    }
}

/// Body written in place of the publication list when the source fails
pub fn fallback_body(source_name: &str) -> String {
    format!(
        "<p>Failed to fetch {} right now. Please try again later.</p>",
        escape_html(source_name)
    )
}

/// Write the document, creating its parent directory first
pub fn write_page(path: &Path, html: &str) -> Result<(), PageError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| PageError::CreateDir {
            path: parent.display().to_string(),
            source,
        })?;
    }
    fs::write(path, html).map_err(|source| PageError::Write {
        path: path.display().to_string(),
        source,
    })
}
