//! Where product pages come from: open browser tabs, a plain HTTP fetch, or
//! fixed HTML. The orchestrator only sees [`PageSource`].

use async_trait::async_trait;
use regex::Regex;
use std::sync::{Arc, Mutex};

use crate::extraction::ProductExtractor;
use crate::models::ProductSnapshot;
use crate::utils::error::{AppError, Result};

pub mod browser;
pub mod http;

pub use browser::BrowserPageSource;
pub use http::HttpPageSource;

/// One page the source can run extraction against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageHandle {
    pub id: String,
    pub url: String,
}

#[async_trait]
pub trait PageSource: Send + Sync {
    /// First open page whose URL matches `pattern`.
    async fn find_page(&self, pattern: &UrlPattern) -> Result<Option<PageHandle>>;

    /// The page the user is looking at, for the display path.
    async fn active_page(&self) -> Result<Option<PageHandle>>;

    /// Runs extraction in the page. `Ok(None)` means the page produced no
    /// result (gone, or not a document).
    async fn extract(&self, page: &PageHandle) -> Result<Option<ProductSnapshot>>;

    /// Opens `url` in a new page.
    async fn open_page(&self, url: &str) -> Result<()>;
}

/// Browser-style match pattern: `<scheme>://<host><path>`, where scheme may
/// be `*` (http or https), host may be `*` or start with `*.`, and path may
/// contain `*` wildcards.
#[derive(Debug, Clone)]
pub struct UrlPattern {
    raw: String,
    regex: Regex,
}

impl UrlPattern {
    pub fn parse(pattern: &str) -> Result<Self> {
        let invalid = || AppError::Validation(format!("Invalid URL pattern: {}", pattern));

        let (scheme, rest) = pattern.split_once("://").ok_or_else(invalid)?;
        let slash = rest.find('/').ok_or_else(invalid)?;
        let (host, path) = rest.split_at(slash);

        let scheme = match scheme {
            "*" => "https?".to_string(),
            "http" | "https" => regex::escape(scheme),
            _ => return Err(invalid()),
        };

        let host = if host == "*" {
            "[^/]+".to_string()
        } else if let Some(domain) = host.strip_prefix("*.") {
            if domain.is_empty() || domain.contains('*') {
                return Err(invalid());
            }
            format!(r"(?:[^/]+\.)?{}", regex::escape(domain))
        } else if host.is_empty() || host.contains('*') {
            return Err(invalid());
        } else {
            regex::escape(host)
        };

        let path = path
            .split('*')
            .map(regex::escape)
            .collect::<Vec<_>>()
            .join(".*");

        let regex = Regex::new(&format!(r"^{}://{}(?::\d+)?{}$", scheme, host, path))
            .map_err(|_| invalid())?;

        Ok(Self {
            raw: pattern.to_string(),
            regex,
        })
    }

    pub fn matches(&self, url: &str) -> bool {
        self.regex.is_match(url)
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

/// Serves fixed HTML documents; the last one added is the active page.
pub struct StaticPageSource {
    extractor: Arc<ProductExtractor>,
    pages: Mutex<Vec<(String, Option<String>)>>,
    opened: Mutex<Vec<String>>,
}

impl StaticPageSource {
    pub fn new(extractor: Arc<ProductExtractor>) -> Self {
        Self {
            extractor,
            pages: Mutex::new(Vec::new()),
            opened: Mutex::new(Vec::new()),
        }
    }

    /// Adds a page. `None` HTML models a page that returns no result.
    pub fn add_page(&self, url: &str, html: Option<&str>) -> PageHandle {
        let mut pages = self.pages.lock().unwrap_or_else(|e| e.into_inner());
        pages.push((url.to_string(), html.map(str::to_string)));
        PageHandle {
            id: (pages.len() - 1).to_string(),
            url: url.to_string(),
        }
    }

    /// URLs passed to [`PageSource::open_page`], in order.
    pub fn opened_pages(&self) -> Vec<String> {
        self.opened.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn handles(&self) -> Vec<PageHandle> {
        self.pages
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .enumerate()
            .map(|(i, (url, _))| PageHandle {
                id: i.to_string(),
                url: url.clone(),
            })
            .collect()
    }
}

#[async_trait]
impl PageSource for StaticPageSource {
    async fn find_page(&self, pattern: &UrlPattern) -> Result<Option<PageHandle>> {
        Ok(self.handles().into_iter().find(|page| pattern.matches(&page.url)))
    }

    async fn active_page(&self) -> Result<Option<PageHandle>> {
        Ok(self.handles().pop())
    }

    async fn extract(&self, page: &PageHandle) -> Result<Option<ProductSnapshot>> {
        let html = {
            let pages = self.pages.lock().unwrap_or_else(|e| e.into_inner());
            page.id
                .parse::<usize>()
                .ok()
                .and_then(|i| pages.get(i))
                .and_then(|(_, html)| html.clone())
        };
        Ok(html.map(|html| self.extractor.extract(&html, &page.url)))
    }

    async fn open_page(&self, url: &str) -> Result<()> {
        self.opened
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(url.to_string());
        Ok(())
    }
}
