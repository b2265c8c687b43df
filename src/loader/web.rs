use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::OnceLock;
use std::time::{Duration, Instant};

use regex::Regex;
use scraper::node::Node;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use super::{LoadOutcome, SourceDocument, SourceType};
use crate::error::{GrainError, Result};

const REQUEST_TIMEOUT_SECONDS: u64 = 30;
const USER_AGENT: &str = concat!("grain/", env!("CARGO_PKG_VERSION"), " (university knowledge base)");

/// Elements whose text never belongs to page content
const SKIPPED_TAGS: &[&str] = &["script", "style", "noscript", "header", "footer", "nav"];

/// Containers that usually hold the main content of a page
const CONTENT_SELECTOR: &str =
    "main, article, #content, .content, #main, .main, .post, .entry, .page, .article";

/// Fetches pages one at a time, waiting `delay` between requests to the same host
pub struct WebScraper {
    client: reqwest::Client,
    delay: Duration,
    last_request: HashMap<String, Instant>,
}

impl WebScraper {
    pub fn new(delay: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECONDS))
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self {
            client,
            delay,
            last_request: HashMap::new(),
        })
    }

    /// Scrape every URL listed in a newline-delimited links file
    pub async fn scrape_links_file(&mut self, links_file: &Path) -> LoadOutcome {
        let mut outcome = LoadOutcome::default();

        let content = match std::fs::read_to_string(links_file) {
            Ok(content) => content,
            Err(e) => {
                outcome.fail(links_file.display().to_string(), e);
                return outcome;
            }
        };

        let urls = read_links(&content);
        tracing::info!("Found {} URLs in {}", urls.len(), links_file.display());

        for raw in urls {
            match self.scrape_url(&raw).await {
                Ok(doc) => outcome.documents.push(doc),
                Err(e) => outcome.fail(raw, e),
            }
        }

        tracing::info!(
            "Scraped {} of {} URLs",
            outcome.documents.len(),
            outcome.documents.len() + outcome.failures.len()
        );
        outcome
    }

    /// Fetch one page and reduce it to clean text
    pub async fn scrape_url(&mut self, raw: &str) -> Result<SourceDocument> {
        let url = Url::parse(raw)?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(GrainError::Ingestion {
                source_id: raw.to_string(),
                reason: format!("unsupported scheme '{}'", url.scheme()),
            });
        }

        self.wait_for_host(&url).await;
        tracing::info!("Scraping {}", url);

        let response = self
            .client
            .get(url.clone())
            .header(
                reqwest::header::ACCEPT,
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            )
            .header(reqwest::header::ACCEPT_LANGUAGE, "en-US,en;q=0.5")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(GrainError::Ingestion {
                source_id: raw.to_string(),
                reason: format!("HTTP {}", status),
            });
        }

        let html = response.text().await?;
        let text = extract_text_from_html(&html, raw)?;
        if text.is_empty() {
            return Err(GrainError::Ingestion {
                source_id: raw.to_string(),
                reason: "page has no text content".into(),
            });
        }

        Ok(SourceDocument {
            source_id: raw.to_string(),
            source_type: SourceType::Web,
            text,
        })
    }

    async fn wait_for_host(&mut self, url: &Url) {
        let host = url.host_str().unwrap_or_default().to_string();
        if let Some(last) = self.last_request.get(&host) {
            let elapsed = last.elapsed();
            if elapsed < self.delay {
                tokio::time::sleep(self.delay - elapsed).await;
            }
        }
        self.last_request.insert(host, Instant::now());
    }
}

/// Non-empty, non-comment lines in first-seen order with duplicates removed
pub fn read_links(content: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter(|line| seen.insert(line.to_string()))
        .map(str::to_string)
        .collect()
}

/// Page text prefixed with its title and URL, boilerplate removed,
/// whitespace collapsed
pub fn extract_text_from_html(html: &str, url: &str) -> Result<String> {
    let document = Html::parse_document(html);

    let title = document
        .select(&selector("title")?)
        .next()
        .map(|t| t.text().collect::<String>())
        .unwrap_or_default();

    let content = selector(CONTENT_SELECTOR)?;
    let mut body = String::new();
    // Nested content containers would repeat their text
    let outermost = document.select(&content).filter(|el| {
        !el.ancestors()
            .filter_map(ElementRef::wrap)
            .any(|ancestor| content.matches(&ancestor))
    });
    for element in outermost {
        collect_text(element, &mut body);
        body.push('\n');
    }

    if body.trim().is_empty() {
        let root = document
            .select(&selector("body")?)
            .next()
            .unwrap_or_else(|| document.root_element());
        collect_text(root, &mut body);
    }

    let body = clean_text(&body);
    if body.is_empty() {
        return Ok(String::new());
    }

    Ok(clean_text(&format!(
        "Title: {}\nURL: {}\n\n{}",
        title.trim(),
        url,
        body
    )))
}

fn collect_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => {
                out.push_str(text);
                out.push(' ');
            }
            Node::Element(el) if SKIPPED_TAGS.contains(&el.name()) => {}
            Node::Element(_) => {
                if let Some(child) = ElementRef::wrap(child) {
                    collect_text(child, out);
                }
            }
            _ => {}
        }
    }
}

fn clean_text(text: &str) -> String {
    static WHITESPACE: OnceLock<Regex> = OnceLock::new();
    let re = WHITESPACE.get_or_init(|| Regex::new(r"\s+").expect("static regex"));
    re.replace_all(text, " ").trim().to_string()
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| GrainError::Config(format!("bad selector '{}': {}", css, e)))
}
