use anyhow::{anyhow, Context, Result};
use headless_chrome::protocol::cdp::Network::Cookie;
use headless_chrome::Tab;
use headless_chrome::{browser::default_executable, Browser, LaunchOptions};
use std::sync::Arc;
use std::thread::sleep;
use std::time::Duration;
use sysinfo::{Pid, PidExt, ProcessExt, System, SystemExt};

use crate::{
    types::{PageSnapshot, ScrapeError, SessionCookie},
    utils::wait_after_navigation,
};

/// Source of rendered pages. The runner only talks to this seam, so tests can
/// hand it canned snapshots instead of a live browser.
pub trait PageFetcher {
    fn fetch(&self, url: &str) -> Result<PageSnapshot, ScrapeError>;
}

impl From<&Cookie> for SessionCookie {
    fn from(c: &Cookie) -> Self {
        SessionCookie {
            name: c.name.clone(),
            value: c.value.clone(),
            domain: c.domain.clone(),
            path: c.path.clone(),
            secure: c.secure,
            http_only: c.http_only,
        }
    }
}

pub struct BrowserController {
    browser: Browser,
    tab: Arc<Tab>,
    min_wait_secs: u64,
    max_wait_secs: u64,
}

impl BrowserController {
    pub fn new(timeout: u64, min_wait_secs: u64, max_wait_secs: u64, headless: bool) -> Result<Self> {
        let is_docker = std::env::var("IN_DOCKER").is_ok();
        let executable = default_executable().map_err(|e| anyhow!(e))?;
        let options = LaunchOptions::default_builder()
            .path(Some(executable))
            .headless(headless)
            .window_size(Some((1920, 1080)))
            .idle_browser_timeout(Duration::from_secs(timeout))
            // warning only do this if in docker env
            .sandbox(!is_docker)
            .build()
            .map_err(|e| ScrapeError::Browser(e.to_string()))?;
        let browser = Browser::new(options).context("browser launching error")?;
        let tab = browser.new_tab().context("could not create new tab")?;
        tab.set_default_timeout(Duration::from_secs(timeout));

        Ok(BrowserController {
            browser,
            tab,
            min_wait_secs,
            max_wait_secs,
        })
    }

    fn navigate(&self, url: &str) -> Result<()> {
        self.tab
            .navigate_to(url)
            .context(format!("could not navigate to {}", url))?
            .wait_until_navigated()
            .context(format!("error waiting for navigation to {}", url))?;

        // the video element is filled in by client side scripts
        let wait = wait_after_navigation(self.min_wait_secs, self.max_wait_secs);
        debug!("sleeping for {:?}", wait);
        sleep(wait);
        Ok(())
    }

    fn snapshot(&self, requested_url: &str) -> Result<PageSnapshot> {
        let html = self.tab.get_content().context("could not read page content")?;
        let cookies = self
            .tab
            .get_cookies()
            .context("could not read session cookies")?
            .iter()
            .map(SessionCookie::from)
            .collect::<Vec<_>>();
        debug!("captured {} cookies from {}", cookies.len(), self.tab.get_url());

        Ok(PageSnapshot {
            requested_url: requested_url.into(),
            current_url: self.tab.get_url(),
            html,
            cookies,
        })
    }

    pub fn kill(&self) -> bool {
        let pid = match self.browser.get_process_id() {
            Some(pid) => pid,
            None => return false,
        };
        let pid = Pid::from_u32(pid);
        let mut s = System::new();
        if !s.refresh_process(pid) {
            return false;
        }
        if let Some(process) = s.process(pid) {
            debug!("killing process with id {}", pid);
            return process.kill();
        }
        false
    }
}

impl PageFetcher for BrowserController {
    fn fetch(&self, url: &str) -> Result<PageSnapshot, ScrapeError> {
        self.navigate(url)
            .and_then(|_| self.snapshot(url))
            .map_err(|e| ScrapeError::Navigation(format!("{:#}", e)))
    }
}

impl Drop for BrowserController {
    fn drop(&mut self) {
        debug!("killing browser process...");
        self.kill();
    }
}
