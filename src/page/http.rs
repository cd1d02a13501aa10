use async_trait::async_trait;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;

use super::{PageHandle, PageSource, UrlPattern};
use crate::config::ScraperConfig;
use crate::extraction::ProductExtractor;
use crate::models::ProductSnapshot;
use crate::utils::error::{AppError, Result};

/// A single configured product URL, fetched without a browser.
///
/// Works for pages that render the price server-side.
pub struct HttpPageSource {
    client: Client,
    product_url: String,
    extractor: Arc<ProductExtractor>,
}

impl HttpPageSource {
    pub fn new(config: &ScraperConfig, extractor: Arc<ProductExtractor>) -> Result<Self> {
        let product_url = config.product_url.clone().ok_or_else(|| {
            AppError::Validation("product_url is required for the HTTP page source".to_string())
        })?;

        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(Duration::from_secs(config.request_timeout))
            .build()?;

        Ok(Self {
            client,
            product_url,
            extractor,
        })
    }

    fn page(&self) -> PageHandle {
        PageHandle {
            id: "http".to_string(),
            url: self.product_url.clone(),
        }
    }
}

#[async_trait]
impl PageSource for HttpPageSource {
    async fn find_page(&self, pattern: &UrlPattern) -> Result<Option<PageHandle>> {
        Ok(pattern.matches(&self.product_url).then(|| self.page()))
    }

    async fn active_page(&self) -> Result<Option<PageHandle>> {
        Ok(Some(self.page()))
    }

    async fn extract(&self, page: &PageHandle) -> Result<Option<ProductSnapshot>> {
        let response = self.client.get(&page.url).send().await?;

        if !response.status().is_success() {
            tracing::warn!("Fetching {} returned {}", page.url, response.status());
            return Ok(None);
        }

        let final_url = response.url().to_string();
        let html = response.text().await?;
        Ok(Some(self.extractor.extract(&html, &final_url)))
    }

    async fn open_page(&self, url: &str) -> Result<()> {
        // No browser to hand the page to; surface it where the user looks.
        tracing::info!("Open product page: {}", url);
        Ok(())
    }
}
