//! Headless Chrome rendering of pages whose lists are filled in client-side.
//!
//! Every call launches its own browser and tears it down before returning.
//! `headless_chrome` is blocking, so the work runs on tokio's blocking pool.

use std::ffi::OsStr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use headless_chrome::{Browser, LaunchOptions, Tab};
use log::{debug, info, warn};

use crate::config::{self, RenderConfig};
use crate::error::{Result, ScrapeError};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// What to wait for once the DOM content has loaded.
#[derive(Debug, Clone)]
pub enum WaitFor {
    /// Sleep for the configured settle delay.
    Settle,
    /// Wait for the first of these selectors to appear. Running out of time
    /// is not an error; the page is read as it is.
    AnyOf(Vec<String>),
}

impl WaitFor {
    pub fn any_of<I, S>(selectors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        WaitFor::AnyOf(selectors.into_iter().map(Into::into).collect())
    }
}

#[derive(Debug, Clone)]
pub struct PageRenderer {
    config: RenderConfig,
}

impl PageRenderer {
    pub fn new(config: RenderConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Load `url` in a fresh headless browser and return the rendered markup.
    /// Navigation failures are returned as-is, without retrying.
    pub async fn fetch_rendered(&self, url: &str, wait: WaitFor) -> Result<String> {
        let config = self.config.clone();
        let target = url.to_string();

        tokio::task::spawn_blocking(move || render_blocking(&config, &target, &wait))
            .await
            .map_err(|e| ScrapeError::Render {
                url: url.to_string(),
                reason: format!("render task failed: {}", e),
            })?
    }
}

/// One browser process and its single tab. Dropping it closes both, on
/// every exit path.
struct BrowserSession {
    // Field order matters: the tab goes before the browser.
    tab: Arc<Tab>,
    _browser: Browser,
}

impl BrowserSession {
    fn launch(config: &RenderConfig) -> Result<Self> {
        let user_agent_arg = format!("--user-agent={}", config.user_agent);
        let args: Vec<&OsStr> = vec![
            OsStr::new("--no-sandbox"),
            OsStr::new("--disable-dev-shm-usage"),
            OsStr::new("--disable-blink-features=AutomationControlled"),
            OsStr::new(&user_agent_arg),
        ];

        let options = LaunchOptions::default_builder()
            .headless(true)
            .sandbox(false)
            .window_size(Some(config.window_size))
            .idle_browser_timeout(config.navigation_timeout + config.selector_timeout)
            .args(args)
            .build()
            .map_err(|e| ScrapeError::BrowserLaunch(e.to_string()))?;

        let browser = Browser::new(options).map_err(|e| ScrapeError::BrowserLaunch(e.to_string()))?;
        let tab = browser
            .new_tab()
            .map_err(|e| ScrapeError::BrowserLaunch(format!("could not open a tab: {}", e)))?;
        tab.set_default_timeout(config.navigation_timeout);
        tab.set_user_agent(&config.user_agent, Some(config::ACCEPT_LANGUAGE), None)
            .map_err(|e| ScrapeError::BrowserLaunch(format!("could not set user agent: {}", e)))?;

        debug!("Browser launched");
        Ok(Self { tab, _browser: browser })
    }
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        if let Err(e) = self.tab.close(false) {
            debug!("Closing tab failed, the browser process is killed anyway: {}", e);
        }
        debug!("Browser torn down");
    }
}

fn render_blocking(config: &RenderConfig, url: &str, wait: &WaitFor) -> Result<String> {
    info!("Rendering {}", url);
    let session = BrowserSession::launch(config)?;
    let tab = &session.tab;

    tab.navigate_to(url).map_err(|e| ScrapeError::Render {
        url: url.to_string(),
        reason: e.to_string(),
    })?;
    wait_for_dom_content(tab, url, config.navigation_timeout)?;

    match wait {
        WaitFor::Settle => std::thread::sleep(config.settle_delay),
        WaitFor::AnyOf(selectors) => match wait_for_any(tab, selectors, config.selector_timeout) {
            Some(found) => debug!("Selector {:?} appeared on {}", found, url),
            None => warn!("None of {:?} appeared on {}, reading page anyway", selectors, url),
        },
    }

    tab.get_content().map_err(|e| ScrapeError::Render {
        url: url.to_string(),
        reason: format!("could not read page content: {}", e),
    })
}

/// Poll `document.readyState` until the DOM has been parsed. Full network
/// idle is never awaited.
fn wait_for_dom_content(tab: &Tab, url: &str, timeout: Duration) -> Result<()> {
    let start = Instant::now();
    loop {
        if let Ok(result) = tab.evaluate("document.readyState", false) {
            let state = result.value.as_ref().and_then(|v| v.as_str()).unwrap_or("loading");
            if state == "interactive" || state == "complete" {
                return Ok(());
            }
        }

        if start.elapsed() > timeout {
            return Err(ScrapeError::RenderTimeout {
                url: url.to_string(),
                reason: format!("DOM content not loaded within {:?}", timeout),
            });
        }
        std::thread::sleep(POLL_INTERVAL);
    }
}

/// First selector in `selectors` present in the page, or `None` on timeout.
fn wait_for_any(tab: &Tab, selectors: &[String], timeout: Duration) -> Option<String> {
    if selectors.is_empty() {
        return None;
    }
    let script = any_selector_script(selectors);
    let start = Instant::now();

    loop {
        if let Ok(result) = tab.evaluate(&script, false) {
            if let Some(found) = result.value.as_ref().and_then(|v| v.as_str()) {
                return Some(found.to_string());
            }
        }

        if start.elapsed() > timeout {
            return None;
        }
        std::thread::sleep(POLL_INTERVAL);
    }
}

/// Script returning the first selector that matches, or null.
fn any_selector_script(selectors: &[String]) -> String {
    let list = serde_json::to_string(selectors).unwrap_or_else(|_| "[]".to_string());
    format!(
        "(() => {{ for (const s of {}) {{ try {{ if (document.querySelector(s)) return s; }} catch (e) {{}} }} return null; }})()",
        list
    )
}
