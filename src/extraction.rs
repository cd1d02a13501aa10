use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::config::SelectorConfig;
use crate::models::{NO_PRODUCT_TITLE, PriceField, ProductSnapshot};
use crate::utils::error::{AppError, Result};

/// Reads a [`ProductSnapshot`] out of a rendered product page.
///
/// Absent elements never fail extraction; they come back as the
/// "No product detected" / "N/A" / empty sentinels.
#[derive(Debug, Clone)]
pub struct ProductExtractor {
    title: Selector,
    price: Selector,
    image: Selector,
    original_price: Selector,
}

impl ProductExtractor {
    pub fn new(selectors: &SelectorConfig) -> Result<Self> {
        Ok(Self {
            title: parse_selector(&selectors.title)?,
            price: parse_selector(&selectors.price)?,
            image: parse_selector(&selectors.image)?,
            original_price: parse_selector(&selectors.original_price)?,
        })
    }

    pub fn extract(&self, html: &str, page_url: &str) -> ProductSnapshot {
        let document = Html::parse_document(html);

        let title = document
            .select(&self.title)
            .next()
            .map(element_text)
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| NO_PRODUCT_TITLE.to_string());

        let price = document
            .select(&self.price)
            .next()
            .map(|el| PriceField::normalize(&element_text(el)))
            .unwrap_or_default();

        let image_url = document
            .select(&self.image)
            .next()
            .and_then(|el| el.value().attr("src").or_else(|| el.value().attr("data-src")))
            .map(|src| resolve_url(page_url, src))
            .unwrap_or_default();

        let original_price = document
            .select(&self.original_price)
            .next()
            .map(|el| PriceField::normalize(&element_text(el)))
            .unwrap_or_default();

        let snapshot = ProductSnapshot {
            title,
            price,
            image_url,
            product_url: page_url.to_string(),
            original_price,
        };

        tracing::debug!(
            title = %snapshot.title,
            price = %snapshot.price,
            original_price = %snapshot.original_price,
            image_url = %snapshot.image_url,
            product_url = %snapshot.product_url,
            "Scraped product data"
        );

        snapshot
    }
}

fn parse_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|_| AppError::Selector {
        selector: selector.to_string(),
    })
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>()
}

/// Lazy-loaded images often carry relative or protocol-relative paths.
fn resolve_url(page_url: &str, src: &str) -> String {
    match Url::parse(page_url).and_then(|base| base.join(src)) {
        Ok(url) => url.to_string(),
        Err(_) => src.to_string(),
    }
}
