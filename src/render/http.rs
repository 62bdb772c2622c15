// src/render/http.rs

//! Static HTTP engine.
//!
//! Renders by plain GET: good enough for server-rendered tables and for
//! SPA pages that embed their data in the initial document. Each context
//! owns its own `reqwest::Client`, so connection pools and cookies stay
//! isolated between contexts.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use scraper::{Html, Selector};

use crate::error::{AppError, Result};
use crate::models::RenderConfig;
use crate::render::engine::{EngineLauncher, PageSession, RenderContext, RenderEngine};
use crate::utils::http::create_async_client;

/// Launcher for [`HttpEngine`].
pub struct HttpLauncher {
    config: RenderConfig,
}

impl HttpLauncher {
    pub fn new(config: RenderConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl EngineLauncher for HttpLauncher {
    async fn launch(&self) -> Result<Arc<dyn RenderEngine>> {
        // Build one client up front so a bad TLS/config setup fails at launch.
        create_async_client(&self.config)
            .map_err(|e| AppError::EngineInit(e.to_string()))?;
        log::info!("HTTP rendering engine ready");
        Ok(Arc::new(HttpEngine {
            config: self.config.clone(),
        }))
    }
}

/// Engine that materializes documents over HTTP.
pub struct HttpEngine {
    config: RenderConfig,
}

#[async_trait]
impl RenderEngine for HttpEngine {
    async fn new_context(&self) -> Result<Arc<dyn RenderContext>> {
        let client = create_async_client(&self.config)?;
        Ok(Arc::new(HttpContext {
            client,
            alive: AtomicBool::new(true),
        }))
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

struct HttpContext {
    client: reqwest::Client,
    alive: AtomicBool,
}

#[async_trait]
impl RenderContext for HttpContext {
    fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }

    async fn new_page(&self) -> Result<Box<dyn PageSession>> {
        if !self.is_alive() {
            return Err(AppError::automation("context already closed"));
        }
        Ok(Box::new(HttpPage {
            client: self.client.clone(),
            url: None,
            document: None,
        }))
    }

    async fn close(&self) -> Result<()> {
        self.alive.store(false, Ordering::Release);
        Ok(())
    }
}

struct HttpPage {
    client: reqwest::Client,
    url: Option<String>,
    document: Option<String>,
}

impl HttpPage {
    fn document(&self) -> Result<&str> {
        self.document
            .as_deref()
            .ok_or_else(|| AppError::automation("page has not navigated"))
    }
}

#[async_trait]
impl PageSession for HttpPage {
    async fn navigate(&mut self, url: &str) -> Result<()> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| classify_request_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::navigation(url, format!("HTTP status {status}")));
        }

        let text = response
            .text()
            .await
            .map_err(|e| classify_request_error(url, e))?;
        self.url = Some(url.to_string());
        self.document = Some(text);
        Ok(())
    }

    async fn wait_for_network_idle(&mut self) -> Result<()> {
        // A single GET has no follow-up traffic.
        self.document().map(|_| ())
    }

    async fn wait_for_selector(&mut self, selector: &str) -> Result<()> {
        let sel = Selector::parse(selector)
            .map_err(|e| AppError::selector(selector, format!("{e:?}")))?;
        let found = {
            let document = Html::parse_document(self.document()?);
            document.select(&sel).next().is_some()
        };
        if found {
            Ok(())
        } else {
            // Static documents never change, so absence is final.
            Err(AppError::timeout(
                format!(
                    "selector '{}' not present in {}",
                    selector,
                    self.url.as_deref().unwrap_or("<blank>")
                ),
                0,
            ))
        }
    }

    async fn evaluate(&mut self, _script: &str) -> Result<()> {
        Err(AppError::Unsupported(
            "script injection requires a scripting engine".to_string(),
        ))
    }

    async fn content(&mut self) -> Result<String> {
        self.document().map(str::to_string)
    }

    async fn close(&mut self) -> Result<()> {
        self.document = None;
        Ok(())
    }
}

fn classify_request_error(url: &str, error: reqwest::Error) -> AppError {
    if error.is_timeout() {
        AppError::timeout(format!("navigation to {url}"), 0)
    } else {
        AppError::navigation(url, error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page_with(html: &str) -> HttpPage {
        HttpPage {
            client: reqwest::Client::new(),
            url: Some("https://x.test/".to_string()),
            document: Some(html.to_string()),
        }
    }

    #[tokio::test]
    async fn test_selector_wait_finds_element() {
        let mut page = page_with("<table class='players'><tr><td>A</td></tr></table>");
        assert!(page.wait_for_selector("table.players").await.is_ok());
    }

    #[tokio::test]
    async fn test_selector_wait_reports_timeout_when_missing() {
        let mut page = page_with("<div>empty</div>");
        let err = page.wait_for_selector("table.players").await.unwrap_err();
        assert!(matches!(err, AppError::Timeout { .. }));
    }

    #[tokio::test]
    async fn test_invalid_selector_is_parse_error() {
        let mut page = page_with("<div></div>");
        let err = page.wait_for_selector("[[bad").await.unwrap_err();
        assert!(matches!(err, AppError::Selector { .. }));
    }

    #[tokio::test]
    async fn test_content_before_navigation_is_automation_error() {
        let mut page = HttpPage {
            client: reqwest::Client::new(),
            url: None,
            document: None,
        };
        assert!(page.content().await.unwrap_err().is_automation());
    }

    #[tokio::test]
    async fn test_closed_context_refuses_pages() {
        let engine = HttpLauncher::new(RenderConfig::default())
            .launch()
            .await
            .unwrap();
        let context = engine.new_context().await.unwrap();
        assert!(context.is_alive());
        context.close().await.unwrap();
        assert!(!context.is_alive());
        assert!(context.new_page().await.is_err());
    }
}
