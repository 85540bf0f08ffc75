//! Redirect resolution.
//!
//! Wikipedia pages are reachable under many titles; the canonical identity of
//! a page is its post-redirect title. The engine never talks to the wiki
//! directly: it consumes a [`RedirectResolver`] collaborator and wraps every
//! lookup in [`resolve_or_fallback`], which bounds the wait and degrades to
//! the original title on any failure. Resolver problems are never surfaced to
//! the player.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

/// Collaborator that maps a title to its canonical (post-redirect) title.
#[async_trait]
pub trait RedirectResolver: Send + Sync {
    /// Resolve `title` to the canonical article title.
    ///
    /// Implementations may fail or hang; callers go through
    /// [`resolve_or_fallback`] which handles both.
    async fn resolve_redirect(&self, title: &str) -> Result<String>;
}

/// Resolve with a bounded wait, falling back to the original title on
/// timeout or resolver error.
pub async fn resolve_or_fallback<R: RedirectResolver + ?Sized>(
    resolver: &R,
    title: &str,
    timeout: Duration,
) -> String {
    match tokio::time::timeout(timeout, resolver.resolve_redirect(title)).await {
        Ok(Ok(canonical)) => canonical,
        Ok(Err(e)) => {
            debug!("redirect lookup for {title:?} failed, using original: {e}");
            title.to_string()
        }
        Err(_) => {
            debug!("redirect lookup for {title:?} timed out after {timeout:?}");
            title.to_string()
        }
    }
}

/// Caching wrapper shared across sessions.
///
/// Resolution is idempotent, so a stale double-insert is harmless; reads take
/// the cheap path and writes double-check before inserting.
pub struct CachingResolver<R> {
    inner: R,
    cache: RwLock<HashMap<String, String>>,
}

impl<R: RedirectResolver> CachingResolver<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn shared(inner: R) -> Arc<Self> {
        Arc::new(Self::new(inner))
    }
}

#[async_trait]
impl<R: RedirectResolver> RedirectResolver for CachingResolver<R> {
    async fn resolve_redirect(&self, title: &str) -> Result<String> {
        {
            let cache = self.cache.read().await;
            if let Some(hit) = cache.get(title) {
                return Ok(hit.clone());
            }
        }

        let canonical = self.inner.resolve_redirect(title).await?;

        let mut cache = self.cache.write().await;
        cache
            .entry(title.to_string())
            .or_insert_with(|| canonical.clone());
        Ok(canonical)
    }
}

/// Resolver that treats every title as already canonical. Useful for tests
/// and for running the engine without a wiki backend.
pub struct IdentityResolver;

#[async_trait]
impl RedirectResolver for IdentityResolver {
    async fn resolve_redirect(&self, title: &str) -> Result<String> {
        Ok(title.to_string())
    }
}
