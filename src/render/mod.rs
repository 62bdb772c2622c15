//! Rendering fetch layer.
//!
//! - `engine`: traits at the engine/context/page seam
//! - `http`: static HTTP engine
//! - `cache`: TTL cache for rendered documents
//! - `pool`: bounded context pool
//! - `service`: `RenderService`, the entry point callers use

pub mod cache;
pub mod engine;
pub mod http;
pub mod pool;
mod service;

pub use cache::{CacheStats, TtlCache};
pub use engine::{EngineLauncher, PageSession, RenderContext, RenderEngine};
pub use http::{HttpEngine, HttpLauncher};
pub use pool::{ContextLease, ContextPool, PoolLimits};
pub use service::RenderService;
