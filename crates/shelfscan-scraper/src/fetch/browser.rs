use std::sync::Arc;

use headless_chrome::{Browser, LaunchOptions, Tab};
use tokio::sync::Mutex;

use super::{check_url, FetchKind, FetchSettings, FetchedPage, Fetcher, HttpFetcher};
use crate::error::ScraperError;

/// Scripted-browser fetcher. One tab per site, reused for every row.
///
/// `headless_chrome` is blocking, so every navigation runs on the blocking
/// pool. Resources (feeds, sitemaps, robots.txt) go through plain HTTP.
pub struct BrowserFetcher {
    // Dropping the browser closes Chrome; it must outlive the tab.
    _browser: Browser,
    tab: Arc<Tab>,
    nav_lock: Mutex<()>,
    settle: std::time::Duration,
    http: HttpFetcher,
}

impl BrowserFetcher {
    /// Launch headless Chrome and open the site's tab.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::Browser`] if Chrome cannot be launched or the
    /// tab cannot be opened, [`ScraperError::Http`] if the companion HTTP
    /// client cannot be built.
    pub async fn launch(settings: &FetchSettings) -> Result<Self, ScraperError> {
        let http = HttpFetcher::new(settings)?;
        let user_agent = settings.user_agent.clone();
        let (browser, tab) = tokio::task::spawn_blocking(move || {
            let browser = Browser::new(LaunchOptions {
                headless: true,
                ..LaunchOptions::default()
            })
            .map_err(|e| ScraperError::Browser(format!("launch failed: {e}")))?;
            let tab = browser
                .new_tab()
                .map_err(|e| ScraperError::Browser(format!("new tab failed: {e}")))?;
            tab.set_user_agent(&user_agent, None, None)
                .map_err(|e| ScraperError::Browser(format!("set user agent failed: {e}")))?;
            Ok::<_, ScraperError>((browser, tab))
        })
        .await
        .map_err(|e| ScraperError::Browser(format!("browser task failed: {e}")))??;

        Ok(Self {
            _browser: browser,
            tab,
            nav_lock: Mutex::new(()),
            settle: settings.settle,
            http,
        })
    }

    async fn render(&self, url: &str) -> Result<FetchedPage, ScraperError> {
        let _guard = self.nav_lock.lock().await;
        let tab = Arc::clone(&self.tab);
        let target = url.to_owned();
        let settle = self.settle;

        let (final_url, body) = tokio::task::spawn_blocking(move || {
            tab.navigate_to(&target)
                .map_err(|e| ScraperError::Browser(format!("navigate to {target}: {e}")))?;
            tab.wait_until_navigated()
                .map_err(|e| ScraperError::Browser(format!("load of {target}: {e}")))?;
            std::thread::sleep(settle);
            let body = tab
                .get_content()
                .map_err(|e| ScraperError::Browser(format!("read DOM of {target}: {e}")))?;
            Ok::<_, ScraperError>((tab.get_url(), body))
        })
        .await
        .map_err(|e| ScraperError::Browser(format!("browser task failed: {e}")))??;

        Ok(FetchedPage {
            url: final_url,
            status: 200,
            body,
            link_header: None,
        })
    }
}

impl Fetcher for BrowserFetcher {
    async fn fetch(&self, url: &str, kind: FetchKind) -> Result<FetchedPage, ScraperError> {
        match kind {
            FetchKind::Page => {
                check_url(url)?;
                self.render(url).await
            }
            FetchKind::Resource => self.http.get(url).await,
        }
    }
}
