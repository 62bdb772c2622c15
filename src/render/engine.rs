// src/render/engine.rs

//! Rendering engine seam.
//!
//! An engine is launched once per [`RenderService`](super::RenderService),
//! hands out isolated contexts, and each context opens short-lived page
//! sessions. Implementations must be cheap to share behind `Arc`.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;

/// Launches the engine singleton.
#[async_trait]
pub trait EngineLauncher: Send + Sync {
    async fn launch(&self) -> Result<Arc<dyn RenderEngine>>;
}

/// A running rendering engine.
#[async_trait]
pub trait RenderEngine: Send + Sync {
    /// Create a new isolated context.
    async fn new_context(&self) -> Result<Arc<dyn RenderContext>>;

    /// Shut the engine down. Contexts are closed separately by the pool.
    async fn close(&self) -> Result<()>;
}

/// An isolated execution context (cookies, storage, connection pool).
#[async_trait]
pub trait RenderContext: Send + Sync {
    /// Lock-free liveness check.
    fn is_alive(&self) -> bool;

    /// Open a page session inside this context.
    async fn new_page(&self) -> Result<Box<dyn PageSession>>;

    async fn close(&self) -> Result<()>;
}

/// A single page inside a context.
#[async_trait]
pub trait PageSession: Send {
    async fn navigate(&mut self, url: &str) -> Result<()>;

    async fn wait_for_network_idle(&mut self) -> Result<()>;

    async fn wait_for_selector(&mut self, selector: &str) -> Result<()>;

    async fn evaluate(&mut self, script: &str) -> Result<()>;

    /// The materialized document.
    async fn content(&mut self) -> Result<String>;

    async fn close(&mut self) -> Result<()>;
}
