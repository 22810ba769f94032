//! Chrome browser lifecycle management
//!
//! Discovers a Chrome/Chromium binary on the system and launches it headless
//! with flags suitable for constrained runtime environments (no sandbox,
//! fixed window size). One browser instance serves exactly one extraction
//! request and is closed unconditionally when the request ends.

use crate::{PipelineConfig, Result, SiftError};
use chromiumoxide::browser::{Browser, BrowserConfig};
use futures::StreamExt;
use std::path::PathBuf;
use tracing::{debug, warn};

/// Handle to a running browser instance.
///
/// The CDP event stream is drained on a spawned task for the lifetime of the
/// browser; dropping the handle after `close` stops the task.
pub struct BrowserHandle {
    pub browser: Browser,
    handler_task: tokio::task::JoinHandle<()>,
}

impl BrowserHandle {
    /// Launch a headless browser for one extraction request
    pub async fn launch(config: &PipelineConfig) -> Result<Self> {
        let chrome_path = match config.chrome_path.clone() {
            Some(path) if path.exists() => path,
            Some(path) => {
                return Err(SiftError::Browser(format!(
                    "configured Chrome binary not found: {}",
                    path.display()
                )))
            }
            None => find_system_chrome().ok_or_else(|| {
                SiftError::Browser("no Chrome or Chromium binary found".to_string())
            })?,
        };

        debug!("Launching browser from {:?}", chrome_path);
        let (width, height) = config.window_size;

        let (browser, mut handler) = Browser::launch(
            BrowserConfig::builder()
                .chrome_executable(&chrome_path)
                .window_size(width, height)
                .arg("--no-sandbox")
                .arg("--disable-setuid-sandbox")
                .arg("--disable-dev-shm-usage")
                .arg("--disable-gpu")
                .arg(format!("--window-size={},{}", width, height))
                .build()
                .map_err(SiftError::Browser)?,
        )
        .await
        .map_err(|e| SiftError::Browser(format!("failed to launch browser: {}", e)))?;

        let handler_task = tokio::spawn(async move {
            while handler.next().await.is_some() {}
        });

        Ok(Self {
            browser,
            handler_task,
        })
    }

    /// Close the browser and stop the event drain task.
    ///
    /// Called on success and failure paths alike; a close failure is logged
    /// rather than masking the pipeline outcome.
    pub async fn close(mut self) {
        if let Err(e) = self.browser.close().await {
            warn!("Failed to close browser cleanly: {}", e);
        }
        if let Err(e) = self.browser.wait().await {
            debug!("Browser process wait: {}", e);
        }
        self.handler_task.abort();
    }
}

/// Find Chrome installed on the system
pub fn find_system_chrome() -> Option<PathBuf> {
    let candidates: Vec<&str> = if cfg!(target_os = "macos") {
        vec![
            "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
            "/Applications/Chromium.app/Contents/MacOS/Chromium",
            "/Applications/Google Chrome Canary.app/Contents/MacOS/Google Chrome Canary",
        ]
    } else if cfg!(target_os = "linux") {
        vec![
            "/usr/bin/google-chrome",
            "/usr/bin/google-chrome-stable",
            "/usr/bin/chromium",
            "/usr/bin/chromium-browser",
            "/snap/bin/chromium",
        ]
    } else if cfg!(target_os = "windows") {
        vec![
            r"C:\Program Files\Google\Chrome\Application\chrome.exe",
            r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe",
        ]
    } else {
        vec![]
    };

    // Check hardcoded paths first
    for candidate in candidates {
        let path = PathBuf::from(candidate);
        if path.exists() {
            return Some(path);
        }
    }

    // Try PATH
    which::which("google-chrome")
        .or_else(|_| which::which("google-chrome-stable"))
        .or_else(|_| which::which("chromium"))
        .or_else(|_| which::which("chromium-browser"))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_system_chrome() {
        // This test just checks that the function doesn't panic
        let _result = find_system_chrome();
    }

    #[tokio::test]
    async fn test_launch_fails_for_missing_binary() {
        let config = PipelineConfig {
            chrome_path: Some(PathBuf::from("/nonexistent/chrome")),
            ..Default::default()
        };
        let result = BrowserHandle::launch(&config).await;
        assert!(matches!(result, Err(SiftError::Browser(_))));
    }
}
