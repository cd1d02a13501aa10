use async_trait::async_trait;
use headless_chrome::{Browser, LaunchOptions, Tab};
use std::ffi::OsStr;
use std::sync::Arc;

use super::{PageHandle, PageSource, UrlPattern};
use crate::config::ScraperConfig;
use crate::extraction::ProductExtractor;
use crate::models::ProductSnapshot;
use crate::utils::error::{AppError, Result};

/// Pages are the tabs of a Chrome instance driven over DevTools.
///
/// Every headless_chrome call blocks, so each one runs on the blocking pool.
pub struct BrowserPageSource {
    browser: Arc<Browser>,
    extractor: Arc<ProductExtractor>,
    user_agent: String,
}

impl BrowserPageSource {
    pub fn launch(config: &ScraperConfig, extractor: Arc<ProductExtractor>) -> Result<Self> {
        let mut launch_options = LaunchOptions::default_builder()
            .headless(true)
            .sandbox(false) // Often needed in containerized environments
            .args(vec![
                OsStr::new("--no-sandbox"),
                OsStr::new("--disable-dev-shm-usage"),
                OsStr::new("--disable-gpu"),
                OsStr::new("--disable-background-timer-throttling"),
                OsStr::new("--disable-backgrounding-occluded-windows"),
                OsStr::new("--disable-renderer-backgrounding"),
            ])
            .build()
            .map_err(|e| AppError::Browser(format!("Failed to create launch options: {}", e)))?;

        if let Some(chrome_path) = &config.chrome_path {
            launch_options.path = Some(std::path::PathBuf::from(chrome_path));
        }

        let browser = Browser::new(launch_options)
            .map_err(|e| AppError::Browser(format!("Failed to launch browser: {}", e)))?;

        let source = Self {
            browser: Arc::new(browser),
            extractor,
            user_agent: config.user_agent.clone(),
        };

        if let Some(product_url) = &config.product_url {
            source.open_tab(product_url)?;
        }

        Ok(source)
    }

    fn open_tab(&self, url: &str) -> Result<Arc<Tab>> {
        let tab = self
            .browser
            .new_tab()
            .map_err(|e| AppError::Browser(format!("Failed to create tab: {}", e)))?;
        tab.set_user_agent(&self.user_agent, None, None)
            .map_err(|e| AppError::Browser(format!("Failed to set user agent: {}", e)))?;
        tab.navigate_to(url)
            .and_then(|tab| tab.wait_until_navigated())
            .map_err(|e| AppError::Browser(format!("Navigation to {} failed: {}", url, e)))?;
        Ok(tab)
    }

    fn tabs(browser: &Browser) -> Result<Vec<Arc<Tab>>> {
        let tabs = browser
            .get_tabs()
            .lock()
            .map_err(|_| AppError::Browser("Tab list lock poisoned".to_string()))?;
        Ok(tabs.clone())
    }

    fn handle(tab: &Tab) -> PageHandle {
        PageHandle {
            id: tab.get_target_id().to_string(),
            url: tab.get_url(),
        }
    }

    async fn blocking<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(Arc<Browser>) -> Result<T> + Send + 'static,
    {
        let browser = Arc::clone(&self.browser);
        tokio::task::spawn_blocking(move || f(browser))
            .await
            .map_err(|e| AppError::Browser(format!("Browser task failed: {}", e)))?
    }
}

#[async_trait]
impl PageSource for BrowserPageSource {
    async fn find_page(&self, pattern: &UrlPattern) -> Result<Option<PageHandle>> {
        let pattern = pattern.clone();
        self.blocking(move |browser| {
            Ok(Self::tabs(&browser)?
                .iter()
                .map(|tab| Self::handle(tab))
                .find(|page| pattern.matches(&page.url)))
        })
        .await
    }

    async fn active_page(&self) -> Result<Option<PageHandle>> {
        self.blocking(|browser| Ok(Self::tabs(&browser)?.last().map(|tab| Self::handle(tab))))
            .await
    }

    async fn extract(&self, page: &PageHandle) -> Result<Option<ProductSnapshot>> {
        let page = page.clone();
        let extractor = Arc::clone(&self.extractor);
        self.blocking(move |browser| {
            let Some(tab) = Self::tabs(&browser)?
                .into_iter()
                .find(|tab| tab.get_target_id().as_str() == page.id)
            else {
                return Ok(None);
            };

            // A tab left open shows whatever price it loaded with.
            tab.reload(false, None)
                .and_then(|tab| tab.wait_until_navigated())
                .map_err(|e| AppError::Browser(format!("Reload of {} failed: {}", page.url, e)))?;

            let html = tab
                .get_content()
                .map_err(|e| AppError::Browser(format!("Failed to get page content: {}", e)))?;

            Ok(Some(extractor.extract(&html, &tab.get_url())))
        })
        .await
    }

    async fn open_page(&self, url: &str) -> Result<()> {
        let url = url.to_string();
        let user_agent = self.user_agent.clone();
        self.blocking(move |browser| {
            let tab = browser
                .new_tab()
                .map_err(|e| AppError::Browser(format!("Failed to create tab: {}", e)))?;
            tab.set_user_agent(&user_agent, None, None)
                .map_err(|e| AppError::Browser(format!("Failed to set user agent: {}", e)))?;
            tab.navigate_to(&url)
                .map_err(|e| AppError::Browser(format!("Navigation to {} failed: {}", url, e)))?;
            Ok(())
        })
        .await
    }
}
