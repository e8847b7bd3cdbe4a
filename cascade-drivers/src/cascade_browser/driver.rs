use crate::cascade_browser::{
    chrome::{chrome_capabilities, ChromeOptions},
    pacing::Pacing,
    page::{PageLayout, WebDriverPage},
};
use anyhow::{Context, Result};
use fantoccini::{Client, ClientBuilder};
use tracing::info;

/// Default Chromedriver endpoint.
pub const DEFAULT_WEBDRIVER_URL: &str = "http://localhost:9515";

/// Thin wrapper around a `fantoccini` WebDriver client.
pub struct CascadeDriver {
    pub client: Client,
}

impl CascadeDriver {
    /// Create a new session against a running WebDriver service at
    /// `webdriver_url` (Chromedriver listens on `DEFAULT_WEBDRIVER_URL`).
    pub async fn connect(webdriver_url: &str, options: &ChromeOptions) -> Result<Self> {
        let client = ClientBuilder::native()
            .capabilities(chrome_capabilities(options))
            .connect(webdriver_url)
            .await
            .with_context(|| format!("connecting to WebDriver at {webdriver_url}"))?;

        info!(
            target: "cascade.driver",
            url = %webdriver_url,
            headless = options.headless,
            "WebDriver session started"
        );
        Ok(Self { client })
    }

    /// Navigate to `url` and return a [`WebDriverPage`] bound to this session.
    pub async fn open(&self, url: &str, layout: PageLayout, pacing: Pacing) -> Result<WebDriverPage> {
        let page = WebDriverPage::new(self.client.clone(), layout, pacing);
        page.goto(url).await?;
        Ok(page)
    }

    /// Close the underlying browser session.
    pub async fn close(self) -> Result<()> {
        self.client.close().await?;
        info!(target: "cascade.driver", "WebDriver session closed");
        Ok(())
    }
}
