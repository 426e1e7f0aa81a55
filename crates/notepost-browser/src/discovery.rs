//! Page target discovery over the DevTools HTTP endpoint.
//!
//! Chrome started with `--remote-debugging-port` lists its targets at
//! `http://host:port/json/list`. Only `page` targets with a WebSocket URL
//! can be driven.

use std::time::Duration;

use serde::Deserialize;

use crate::error::BrowserError;

/// One entry of `/json/list`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TargetInfo {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
    #[serde(rename = "webSocketDebuggerUrl")]
    pub ws_url: Option<String>,
}

impl TargetInfo {
    fn is_drivable_page(&self) -> bool {
        self.kind == "page" && self.ws_url.is_some()
    }
}

/// Pick the target to drive.
///
/// With a hint, the first page whose URL contains it wins; otherwise (or if
/// nothing matches) the first page in list order.
pub fn select_page_target<'a>(
    targets: &'a [TargetInfo],
    url_hint: Option<&str>,
) -> Option<&'a TargetInfo> {
    let mut pages = targets.iter().filter(|t| t.is_drivable_page());
    if let Some(hint) = url_hint.filter(|h| !h.is_empty()) {
        if let Some(hit) = pages.clone().find(|t| t.url.contains(hint)) {
            return Some(hit);
        }
    }
    pages.next()
}

/// `http://host:port` with any trailing slash removed.
fn list_url(endpoint: &str) -> String {
    format!("{}/json/list", endpoint.trim_end_matches('/'))
}

/// Query `endpoint` (e.g. `http://127.0.0.1:9222`) and return the WebSocket
/// URL of the page to drive.
pub async fn discover_page_ws_url(
    endpoint: &str,
    url_hint: Option<&str>,
    timeout: Duration,
) -> Result<String, BrowserError> {
    let url = list_url(endpoint);
    tracing::debug!(url = %url, "listing DevTools targets");

    let client = reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_else(|_| reqwest::Client::new());

    let targets: Vec<TargetInfo> = client
        .get(&url)
        .send()
        .await
        .map_err(|e| BrowserError::ConnectionFailed {
            url: url.clone(),
            reason: e.to_string(),
        })?
        .json()
        .await
        .map_err(|e| BrowserError::Protocol {
            detail: format!("unexpected /json/list payload: {e}"),
        })?;

    let target = select_page_target(&targets, url_hint).ok_or_else(|| {
        BrowserError::NoPageTarget {
            endpoint: endpoint.to_string(),
        }
    })?;
    tracing::info!(target = %target.id, url = %target.url, "selected page target");

    target.ws_url.clone().ok_or_else(|| BrowserError::NoPageTarget {
        endpoint: endpoint.to_string(),
    })
}
