pub mod pdf;
pub mod web;

use std::fmt;
use std::str::FromStr;

pub use pdf::load_pdf_dir;
pub use web::WebScraper;

/// Where a piece of text came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    Pdf,
    Web,
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceType::Pdf => write!(f, "pdf"),
            SourceType::Web => write!(f, "web"),
        }
    }
}

/// Which source types a query may draw from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SourceFilter {
    #[default]
    All,
    Pdf,
    Web,
}

impl SourceFilter {
    pub fn allows(self, source_type: SourceType) -> bool {
        match self {
            SourceFilter::All => true,
            SourceFilter::Pdf => source_type == SourceType::Pdf,
            SourceFilter::Web => source_type == SourceType::Web,
        }
    }
}

impl FromStr for SourceFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "all" | "both" => Ok(SourceFilter::All),
            "pdf" | "pdfs" => Ok(SourceFilter::Pdf),
            "web" | "website" => Ok(SourceFilter::Web),
            other => Err(format!("unknown source '{}', expected all, pdf or web", other)),
        }
    }
}

impl fmt::Display for SourceFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceFilter::All => write!(f, "all"),
            SourceFilter::Pdf => write!(f, "pdf"),
            SourceFilter::Web => write!(f, "web"),
        }
    }
}

/// Raw text of one PDF or web page
#[derive(Debug, Clone, PartialEq)]
pub struct SourceDocument {
    pub source_id: String,
    pub source_type: SourceType,
    pub text: String,
}

/// A source that could not be turned into text
#[derive(Debug, Clone, PartialEq)]
pub struct SourceFailure {
    pub source_id: String,
    pub reason: String,
}

/// Documents that loaded plus the sources that did not
#[derive(Debug, Default)]
pub struct LoadOutcome {
    pub documents: Vec<SourceDocument>,
    pub failures: Vec<SourceFailure>,
}

impl LoadOutcome {
    pub fn merge(&mut self, other: LoadOutcome) {
        self.documents.extend(other.documents);
        self.failures.extend(other.failures);
    }

    pub(crate) fn fail(&mut self, source_id: impl Into<String>, reason: impl fmt::Display) {
        let source_id = source_id.into();
        let reason = reason.to_string();
        tracing::warn!("Skipping {}: {}", source_id, reason);
        self.failures.push(SourceFailure { source_id, reason });
    }
}
