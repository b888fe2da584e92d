//! One scenario's page

use std::collections::BTreeMap;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::Browser;
use chromiumoxide::cdp::browser_protocol::browser::BrowserContextId;
use chromiumoxide::cdp::browser_protocol::target::DisposeBrowserContextParams;
use chromiumoxide::error::CdpError;
use chromiumoxide::page::Page;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::common::{join_url, Error, Result};
use crate::document::{DocumentSession, ElementHandle, ElementSnapshot, ScrollPosition, Selector};

use super::launcher::map_cdp_error;
use super::scripts;

/// Element as serialised by the query script
#[derive(Deserialize)]
struct RawElement {
    tag: String,
    visible: bool,
    text: String,
    attributes: BTreeMap<String, String>,
    path: Vec<u32>,
}

pub struct CdpSession {
    page: Page,
    browser: Arc<Browser>,
    context: BrowserContextId,
    base_url: String,
    navigation_timeout: Duration,
    disconnected: Arc<AtomicBool>,
}

impl CdpSession {
    pub(super) fn new(
        page: Page,
        browser: Arc<Browser>,
        context: BrowserContextId,
        base_url: String,
        navigation_timeout: Duration,
        disconnected: Arc<AtomicBool>,
    ) -> Self {
        Self {
            page,
            browser,
            context,
            base_url,
            navigation_timeout,
            disconnected,
        }
    }

    fn map(&self, error: CdpError) -> Error {
        map_cdp_error(error, &self.disconnected)
    }

    async fn eval<T: DeserializeOwned>(&self, script: String) -> Result<T> {
        let result = self
            .page
            .evaluate_expression(script)
            .await
            .map_err(|e| self.map(e))?;
        result
            .into_value()
            .map_err(|e| Error::ProviderCommunication(format!("unexpected script result: {}", e)))
    }
}

#[async_trait]
impl DocumentSession for CdpSession {
    async fn navigate(&mut self, path: &str) -> Result<()> {
        let url = join_url(&self.base_url, path);
        tracing::debug!(%url, "navigating");

        match tokio::time::timeout(self.navigation_timeout, self.page.goto(url.as_str())).await {
            Err(_) => {
                return Err(Error::navigation_failed(
                    &url,
                    &format!("timed out after {}s", self.navigation_timeout.as_secs()),
                ))
            }
            Ok(Err(e)) => {
                return match self.map(e) {
                    Error::ProviderCommunication(reason) => Err(Error::navigation_failed(&url, &reason)),
                    other => Err(other),
                }
            }
            Ok(Ok(_)) => {}
        }

        let status: u16 = self.eval(scripts::RESPONSE_STATUS.to_string()).await?;
        if status >= 400 {
            return Err(Error::navigation_failed(&url, &format!("HTTP {}", status)));
        }
        Ok(())
    }

    async fn query_selector_all(&mut self, selector: &Selector) -> Result<Vec<ElementSnapshot>> {
        let css = selector.to_string();
        let raw: Vec<RawElement> = self.eval(scripts::query(&css)?).await?;
        Ok(raw
            .into_iter()
            .enumerate()
            .map(|(index, el)| ElementSnapshot {
                handle: ElementHandle {
                    selector: css.clone(),
                    index,
                },
                tag: el.tag,
                visible: el.visible,
                text: el.text,
                attributes: el.attributes,
                path: el.path,
            })
            .collect())
    }

    async fn dispatch_click(&mut self, element: &ElementSnapshot) -> Result<()> {
        let handle = &element.handle;
        let clicked: bool = self.eval(scripts::click(&handle.selector, handle.index)?).await?;
        if !clicked {
            return Err(Error::not_interactable(
                &element.describe(),
                "element was removed before it could be clicked",
            ));
        }
        Ok(())
    }

    async fn scroll_viewport(&mut self, position: ScrollPosition) -> Result<()> {
        let _: bool = self.eval(scripts::scroll(position)).await?;
        Ok(())
    }

    async fn close(self: Box<Self>) -> Result<()> {
        let CdpSession {
            page,
            browser,
            context,
            disconnected,
            ..
        } = *self;
        page.close().await.map_err(|e| map_cdp_error(e, &disconnected))?;
        browser
            .execute(DisposeBrowserContextParams::new(context))
            .await
            .map_err(|e| map_cdp_error(e, &disconnected))?;
        Ok(())
    }
}
