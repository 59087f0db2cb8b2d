use std::path::PathBuf;
use std::time::Duration;

use headless_chrome::{Browser, LaunchOptions};
use reqwest::header::CONTENT_TYPE;
use reqwest::Url;
use tracing::{debug, info, warn};

use super::{file_id, FetchError};
use crate::config::AgendaSettings;

/// One agenda link found on the listing page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgendaLink {
    /// The link's `aria-label`, e.g. "Download PDF Agenda for Town Council".
    pub label: String,
    pub url: String,
}

impl AgendaLink {
    /// File stem of the document URL, used as the record id.
    pub fn id(&self) -> String {
        let name = self
            .url
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or_default();
        let stem = name.strip_suffix(".pdf").unwrap_or(name);
        file_id(stem, "agenda")
    }
}

pub struct AgendaSource {
    client: reqwest::Client,
    listing_url: String,
    selector: String,
    chrome_path: Option<PathBuf>,
    wait_timeout: Duration,
}

impl AgendaSource {
    pub fn new(settings: &AgendaSettings) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.download_timeout_secs))
            .build()?;
        Ok(AgendaSource {
            client,
            listing_url: settings.listing_url.clone(),
            selector: settings.link_selector.clone(),
            chrome_path: settings.chrome_path.clone(),
            wait_timeout: Duration::from_secs(settings.wait_timeout_secs),
        })
    }

    /// Render the listing page in a headless browser and collect agenda links.
    /// The browser process is shut down when this returns, on every path.
    pub async fn list_agendas(&self) -> Result<Vec<AgendaLink>, FetchError> {
        let listing_url = self.listing_url.clone();
        let selector = self.selector.clone();
        let chrome_path = self.chrome_path.clone();
        let wait_timeout = self.wait_timeout;

        info!("Rendering agenda listing: {}", listing_url);
        let raw = tokio::task::spawn_blocking(move || {
            render_links(&listing_url, &selector, chrome_path, wait_timeout)
        })
        .await
        .map_err(|e| FetchError::Browser(e.to_string()))??;

        let links = resolve_links(&self.listing_url, raw);
        info!("Found {} agenda links", links.len());
        Ok(links)
    }

    /// Download a document; anything not served as `application/pdf` is refused.
    pub async fn download(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status,
            });
        }
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        if !is_pdf(&content_type) {
            return Err(FetchError::UnsupportedContent {
                url: url.to_string(),
                content_type,
            });
        }
        let bytes = response.bytes().await?;
        debug!(url, bytes = bytes.len(), "downloaded agenda");
        Ok(bytes.to_vec())
    }
}

fn is_pdf(content_type: &str) -> bool {
    content_type.to_ascii_lowercase().contains("application/pdf")
}

/// `(aria-label, href)` of every element matching `selector`.
fn render_links(
    url: &str,
    selector: &str,
    chrome_path: Option<PathBuf>,
    wait_timeout: Duration,
) -> Result<Vec<(String, String)>, FetchError> {
    let browser_err = |e: anyhow::Error| FetchError::Browser(e.to_string());

    let options = LaunchOptions::default_builder()
        .headless(true)
        .sandbox(false)
        .path(chrome_path)
        .build()
        .map_err(|e| FetchError::Browser(e.to_string()))?;
    let browser = Browser::new(options).map_err(browser_err)?;
    let tab = browser.new_tab().map_err(browser_err)?;
    tab.set_default_timeout(wait_timeout);
    tab.navigate_to(url)
        .and_then(|t| t.wait_until_navigated())
        .map_err(browser_err)?;

    let elements = tab.wait_for_elements(selector).map_err(browser_err)?;
    let mut links = Vec::with_capacity(elements.len());
    for element in elements {
        let attrs = element.get_attributes().map_err(browser_err)?.unwrap_or_default();
        let label = attribute(&attrs, "aria-label").unwrap_or_default();
        match attribute(&attrs, "href") {
            Some(href) => links.push((label, href)),
            None => warn!("agenda link without href: {:?}", label),
        }
    }
    Ok(links)
}

/// DevTools returns attributes flattened as `[name, value, name, value, ...]`.
fn attribute(attrs: &[String], name: &str) -> Option<String> {
    attrs
        .chunks_exact(2)
        .find(|pair| pair[0].eq_ignore_ascii_case(name))
        .map(|pair| pair[1].trim().to_string())
}

/// Resolve relative hrefs against the listing page and drop repeats.
fn resolve_links(listing_url: &str, raw: Vec<(String, String)>) -> Vec<AgendaLink> {
    let base = Url::parse(listing_url).ok();
    let mut links: Vec<AgendaLink> = Vec::with_capacity(raw.len());
    for (label, href) in raw {
        let url = match base.as_ref().map(|b| b.join(&href)) {
            Some(Ok(u)) => u.to_string(),
            _ => href,
        };
        if links.iter().any(|l| l.url == url) {
            continue;
        }
        links.push(AgendaLink { label, url });
    }
    links
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    fn link(url: &str) -> AgendaLink {
        AgendaLink {
            label: "Download PDF Agenda".into(),
            url: url.into(),
        }
    }

    #[test]
    fn id_from_file_stem() {
        assert_eq!(
            link("https://www.fortville.in.gov/files/PC%20Agenda%2011-26-25.pdf?t=1").id(),
            "PC_20Agenda_2011-26-25"
        );
        assert_eq!(link("https://example.org/AgendaFile/42/").id(), "42");
        assert_eq!(link("https://example.org/").id(), "example_org");
    }

    #[test]
    fn attributes_are_paired() {
        let attrs: Vec<String> = ["class", "btn", "aria-label", " Download PDF Agenda ", "href", "/a.pdf"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(attribute(&attrs, "href").as_deref(), Some("/a.pdf"));
        assert_eq!(
            attribute(&attrs, "aria-label").as_deref(),
            Some("Download PDF Agenda")
        );
        assert_eq!(attribute(&attrs, "title"), None);
    }

    #[test]
    fn relative_links_resolved_and_deduplicated() {
        let raw = vec![
            ("A".to_string(), "/files/a.pdf".to_string()),
            ("B".to_string(), "https://cdn.example.org/b.pdf".to_string()),
            ("A again".to_string(), "https://www.fortville.in.gov/files/a.pdf".to_string()),
        ];
        let links = resolve_links("https://www.fortville.in.gov/meetings", raw);
        assert_eq!(links.len(), 2);
        assert_eq!(links[0].url, "https://www.fortville.in.gov/files/a.pdf");
        assert_eq!(links[0].label, "A");
        assert_eq!(links[1].url, "https://cdn.example.org/b.pdf");
    }

    #[test]
    fn pdf_content_types() {
        assert!(is_pdf("application/pdf"));
        assert!(is_pdf("Application/PDF; charset=binary"));
        assert!(!is_pdf("text/html; charset=utf-8"));
        assert!(!is_pdf(""));
    }
}
