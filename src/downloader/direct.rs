//! Bounded direct-URL resolution.
//!
//! The metadata call runs in its own tokio task and the caller waits on it
//! under a deadline. On expiry the task is abandoned, not killed: its handle
//! is dropped and whatever it eventually returns is discarded. It shares no
//! state with the caller, so a late finish is harmless.

use crate::error::{ExtractError, ResolveError};
use crate::extractor::Extractor;
use crate::types::{FormatCandidate, MediaDescriptor};
use std::cmp::Ordering;
use std::sync::Arc;
use std::time::Duration;

/// Resolves a direct stream URL without writing files or creating tasks
#[derive(Clone)]
pub struct DirectResolver {
    extractor: Arc<dyn Extractor>,
}

impl DirectResolver {
    /// Create a resolver over `extractor`
    pub fn new(extractor: Arc<dyn Extractor>) -> Self {
        Self { extractor }
    }

    /// Resolve `url` to the best direct stream URL within `timeout`
    ///
    /// # Errors
    ///
    /// - [`ResolveError::Timeout`] if the collaborator has not answered in time
    /// - [`ResolveError::ExtractionFailed`] if it failed (detail logged here)
    /// - [`ResolveError::NotApplicable`] for live streams
    /// - [`ResolveError::NoStreamFound`] if no usable URL exists
    pub async fn resolve_direct(&self, url: &str, timeout: Duration) -> Result<String, ResolveError> {
        let extractor = self.extractor.clone();
        let owned_url = url.to_string();
        let resolution = tokio::spawn(async move { extractor.resolve(&owned_url).await });

        let descriptor = match tokio::time::timeout(timeout, resolution).await {
            Err(_) => {
                tracing::warn!(url = %url, ?timeout, "direct resolution timed out, abandoning it");
                return Err(ResolveError::Timeout(timeout));
            }
            Ok(Err(join_error)) => {
                tracing::error!(url = %url, error = %join_error, "direct resolution task died");
                return Err(ResolveError::ExtractionFailed(ExtractError::Failed(
                    join_error.to_string(),
                )));
            }
            Ok(Ok(Err(e))) => {
                tracing::error!(
                    url = %url,
                    extractor = self.extractor.name(),
                    error = %e,
                    "direct resolution failed"
                );
                return Err(ResolveError::ExtractionFailed(e));
            }
            Ok(Ok(Ok(descriptor))) => descriptor,
        };

        let direct = select_direct_url(&descriptor);
        match &direct {
            Ok(_) => tracing::info!(url = %url, "direct url resolved"),
            Err(e) => tracing::info!(url = %url, reason = %e, "no direct url"),
        }
        direct
    }
}

/// Pick the URL to hand out for a resolved descriptor
///
/// Live sources are never offered. With a candidate set, the best candidate
/// by [`best_format`] wins; without one, the top-level URL is used.
pub fn select_direct_url(descriptor: &MediaDescriptor) -> Result<String, ResolveError> {
    if descriptor.is_live() {
        return Err(ResolveError::NotApplicable);
    }

    let url = match descriptor.candidates() {
        Some(candidates) => best_format(candidates).and_then(|f| f.url.as_deref()),
        None => descriptor.url.as_deref(),
    };

    url.filter(|u| !u.trim().is_empty())
        .map(str::to_string)
        .ok_or(ResolveError::NoStreamFound)
}

/// Maximum by `(height, bitrate, filesize)`, missing values as 0; first maximum wins on ties
pub fn best_format(candidates: &[FormatCandidate]) -> Option<&FormatCandidate> {
    candidates.iter().reduce(|best, candidate| {
        if compare_formats(candidate, best) == Ordering::Greater {
            candidate
        } else {
            best
        }
    })
}

fn compare_formats(a: &FormatCandidate, b: &FormatCandidate) -> Ordering {
    a.height
        .unwrap_or(0)
        .cmp(&b.height.unwrap_or(0))
        .then_with(|| a.bitrate.unwrap_or(0.0).total_cmp(&b.bitrate.unwrap_or(0.0)))
        .then_with(|| a.filesize.unwrap_or(0).cmp(&b.filesize.unwrap_or(0)))
}
