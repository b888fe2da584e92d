//! Browser process lifecycle

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::emulation::SetDeviceMetricsOverrideParams;
use chromiumoxide::cdp::browser_protocol::target::{
    CreateBrowserContextParams, CreateTargetParams, DisposeBrowserContextParams,
};
use chromiumoxide::error::CdpError;
use futures_util::StreamExt;
use tempfile::TempDir;
use tokio::task::JoinHandle;

use crate::common::config::{BrowserSettings, Timeouts};
use crate::common::{paths, Error, Result};
use crate::document::{DocumentProvider, DocumentSession};

use super::session::CdpSession;

/// Classify a CDP error, treating a dead connection as fatal
pub(crate) fn map_cdp_error(error: CdpError, disconnected: &AtomicBool) -> Error {
    match error {
        CdpError::Ws(_) | CdpError::ChannelSendError(_) | CdpError::NoResponse => {
            disconnected.store(true, Ordering::SeqCst);
            Error::ProviderDisconnected(error.to_string())
        }
        other if disconnected.load(Ordering::SeqCst) => Error::ProviderDisconnected(other.to_string()),
        other => Error::ProviderCommunication(other.to_string()),
    }
}

/// Document provider backed by a headless Chromium over CDP
///
/// Every session gets its own browser context, so cookies and storage never
/// leak between scenarios.
pub struct CdpProvider {
    browser: Arc<Browser>,
    handler: JoinHandle<()>,
    base_url: String,
    viewport: (u32, u32),
    navigation_timeout: Duration,
    disconnected: Arc<AtomicBool>,
    _profile: TempDir,
}

impl CdpProvider {
    /// Launch the browser and start its event loop
    pub async fn launch(settings: &BrowserSettings, timeouts: &Timeouts, base_url: &str) -> Result<Self> {
        let root = paths::profile_root();
        std::fs::create_dir_all(&root)?;
        let profile = tempfile::Builder::new().prefix("run-").tempdir_in(&root)?;

        let mut builder = BrowserConfig::builder()
            .user_data_dir(profile.path())
            .window_size(settings.viewport_width, settings.viewport_height)
            .launch_timeout(timeouts.launch())
            .request_timeout(timeouts.navigation());
        if !settings.headless {
            builder = builder.with_head();
        }
        if let Some(executable) = settings.resolve_executable() {
            tracing::debug!(executable = %executable.display(), "using browser");
            builder = builder.chrome_executable(executable);
        }
        if !settings.args.is_empty() {
            builder = builder.args(settings.args.clone());
        }
        let config = builder.build().map_err(Error::BrowserLaunch)?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| Error::BrowserLaunch(e.to_string()))?;

        let disconnected = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&disconnected);
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                match event {
                    Ok(()) => {}
                    Err(CdpError::Ws(e)) => {
                        tracing::warn!(error = %e, "browser connection closed");
                        break;
                    }
                    Err(e) => tracing::debug!(error = %e, "CDP handler error"),
                }
            }
            flag.store(true, Ordering::SeqCst);
            tracing::debug!("CDP handler stopped");
        });

        tracing::info!(headless = settings.headless, "browser launched");
        Ok(Self {
            browser: Arc::new(browser),
            handler,
            base_url: base_url.to_string(),
            viewport: (settings.viewport_width, settings.viewport_height),
            navigation_timeout: timeouts.navigation(),
            disconnected,
            _profile: profile,
        })
    }

    /// Close the browser and wait for the process to exit
    pub async fn shutdown(self) -> Result<()> {
        match Arc::try_unwrap(self.browser) {
            Ok(mut browser) => {
                if let Err(e) = browser.close().await {
                    tracing::debug!(error = %e, "browser close failed");
                }
                let _ = browser.wait().await;
            }
            Err(_) => tracing::warn!("sessions still open at shutdown; dropping browser"),
        }
        self.handler.abort();
        Ok(())
    }
}

#[async_trait]
impl DocumentProvider for CdpProvider {
    async fn open_session(&self) -> Result<Box<dyn DocumentSession>> {
        if self.disconnected.load(Ordering::SeqCst) {
            return Err(Error::ProviderDisconnected("browser connection lost".into()));
        }
        let map = |e: CdpError| map_cdp_error(e, &self.disconnected);

        let context = self
            .browser
            .execute(CreateBrowserContextParams::default())
            .await
            .map_err(map)?
            .result
            .browser_context_id;

        let target = CreateTargetParams::builder()
            .url("about:blank")
            .browser_context_id(context.clone())
            .build()
            .map_err(Error::ProviderCommunication)?;
        let page = match self.browser.new_page(target).await {
            Ok(page) => page,
            Err(e) => {
                let _ = self
                    .browser
                    .execute(DisposeBrowserContextParams::new(context))
                    .await;
                return Err(map(e));
            }
        };

        let (width, height) = self.viewport;
        let metrics = SetDeviceMetricsOverrideParams::builder()
            .width(width as i64)
            .height(height as i64)
            .device_scale_factor(1.0)
            .mobile(false)
            .build()
            .map_err(Error::ProviderCommunication)?;
        page.execute(metrics).await.map_err(map)?;

        tracing::debug!("browser session opened");
        Ok(Box::new(CdpSession::new(
            page,
            Arc::clone(&self.browser),
            context,
            self.base_url.clone(),
            self.navigation_timeout,
            Arc::clone(&self.disconnected),
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lost_connection_marks_provider_disconnected() {
        let disconnected = AtomicBool::new(false);
        let err = map_cdp_error(CdpError::Timeout, &disconnected);
        assert!(matches!(err, Error::ProviderCommunication(_)), "{:?}", err);
        assert!(!disconnected.load(Ordering::SeqCst));

        let err = map_cdp_error(CdpError::NoResponse, &disconnected);
        assert!(matches!(err, Error::ProviderDisconnected(_)), "{:?}", err);
        assert!(err.is_fatal_to_suite());
        assert!(disconnected.load(Ordering::SeqCst));

        // Once the connection is gone every later error is a disconnect too
        let err = map_cdp_error(CdpError::Timeout, &disconnected);
        assert!(matches!(err, Error::ProviderDisconnected(_)), "{:?}", err);
    }
}
