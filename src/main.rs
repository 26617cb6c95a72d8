use clap::{Parser, ValueEnum};
use colored::Colorize;
use pubpage::identity::AuthorIdentity;
use pubpage::sources::{
    bibfile::BibFileSource, crossref::CrossRefSource, zbmath::ZbMathSource, Source, SourceError,
};
use pubpage::{PageBuilder, PageOutcome, SiteConfig};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SourceKind {
    /// Crossref works search
    Crossref,
    /// Local BibTeX file
    Bibfile,
    /// zbMATH Open document search
    Zbmath,
}

impl SourceKind {
    fn display_name(self) -> &'static str {
        match self {
            SourceKind::Crossref => "Crossref",
            SourceKind::Bibfile => "BibTeX",
            SourceKind::Zbmath => "zbMATH",
        }
    }

    fn open(self, config: &SiteConfig) -> Result<Box<dyn Source>, SourceError> {
        Ok(match self {
            SourceKind::Crossref => Box::new(CrossRefSource::new(config)?),
            SourceKind::Bibfile => Box::new(BibFileSource::new(&config.bib_path)),
            SourceKind::Zbmath => Box::new(ZbMathSource::new(config)?),
        })
    }
}

#[derive(Parser, Debug)]
#[command(name = "pubpage")]
#[command(version = "0.1.0")]
#[command(about = "Generate a static publications page for one author", long_about = None)]
struct Args {
    /// Where the publication records come from
    #[arg(long, value_enum, default_value = "crossref")]
    source: SourceKind,

    /// Output HTML file
    #[arg(long, short)]
    output: Option<PathBuf>,

    /// BibTeX file read by the bibfile source
    #[arg(long)]
    bib: Option<PathBuf>,

    /// Maximum number of records requested from remote sources
    #[arg(long)]
    rows: Option<usize>,

    /// Author given name
    #[arg(long)]
    given: Option<String>,

    /// Author family name
    #[arg(long)]
    family: Option<String>,

    /// Author ORCID iD (bare or as an orcid.org URL)
    #[arg(long)]
    orcid: Option<String>,

    /// Additional spelling of the author's name accepted in free-text author fields
    #[arg(long = "alias")]
    aliases: Vec<String>,

    /// Contact address sent to remote APIs
    #[arg(long)]
    contact: Option<String>,

    /// Verbose output
    #[arg(long, short)]
    verbose: bool,
}

impl Args {
    fn into_config(self) -> (SourceKind, SiteConfig) {
        let mut config = SiteConfig::default();

        if self.given.is_some() || self.family.is_some() || self.orcid.is_some() {
            let defaults = AuthorIdentity::default();
            let mut identity = AuthorIdentity::new(
                self.given.unwrap_or(defaults.given),
                self.family.unwrap_or(defaults.family),
            );
            if let Some(orcid) = self.orcid {
                identity = identity.with_orcid(orcid);
            }
            config.identity = identity;
        }
        for alias in self.aliases {
            config.identity = config.identity.with_alias(alias);
        }

        if let Some(output) = self.output {
            config.output = output;
        }
        if let Some(bib) = self.bib {
            config.bib_path = bib;
        }
        if let Some(rows) = self.rows {
            config.rows = rows;
        }
        if let Some(contact) = self.contact {
            config.contact = contact;
        }

        (self.source, config)
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    // Initialize logging
    let default_filter = if args.verbose {
        "pubpage=debug"
    } else {
        "pubpage=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    let (kind, config) = args.into_config();
    let builder = PageBuilder::new(&config);

    let outcome = match kind.open(&config) {
        Ok(source) => builder.build(source.as_ref()).await,
        Err(e) => builder.write_fallback(kind.display_name(), &e),
    };

    // Exit status is always success; failures only show in the page and the log.
    match outcome {
        Ok(PageOutcome::Published { records }) => println!(
            "{} Generated {} with {} entries",
            "✓".green().bold(),
            config.output.display().to_string().cyan(),
            records
        ),
        Ok(PageOutcome::Fallback { reason }) => println!(
            "{} Wrote fallback page to {} ({})",
            "!".yellow().bold(),
            config.output.display().to_string().cyan(),
            reason
        ),
        Err(e) => eprintln!("{} {}", "Error:".red().bold(), e),
    }

    ExitCode::SUCCESS
}
