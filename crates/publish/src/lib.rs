//! Content-addressed asset publishing.
//!
//! [`Pipeline`] drives each input through its transforms, publishes every
//! file it references (recursively for stylesheets), substitutes the
//! resulting URLs back in and publishes the input itself through a
//! [`Publisher`].

pub mod error;
mod mime;
mod naming;
mod pipeline;
mod publisher;
mod read;

pub use crate::mime::{content_type, data_uri, is_inlinable, mime_type, should_gzip};
pub use crate::naming::{Naming, StorageName, content_hash, normalize_name, public_url, storage_name};
pub use crate::pipeline::Pipeline;
pub use crate::publisher::{Outcome, PublishedAsset, Publisher};
pub use crate::read::read_inputs;

use async_stream::stream;
use futures::stream::FuturesUnordered;
use futures::{Stream, StreamExt};

/// Maximum number of publishes in flight per batch.
pub const MAX_PUBLISH_CONCURRENCY: usize = 8;
/// Referenced images and fonts up to this size are inlined as data URIs.
pub const DATA_URI_LIMIT: usize = 10 * 1024;
/// Files this size or larger are never uploaded.
pub const MAX_UPLOAD_SIZE: usize = 50 * 1024 * 1024;

/// Drive `futures` with at most `limit` in flight, yielding outputs in
/// completion order. Futures start in the order given.
pub(crate) fn bounded<'a, F>(mut futures: Vec<F>, limit: usize) -> impl Stream<Item = F::Output> + 'a
where
    F: Future + 'a,
{
    // `rustfmt` does not format macros that use braces. Wrap in parentheses!
    stream!({
        let mut processing = FuturesUnordered::new();
        processing.extend(futures.drain(..limit.max(1).min(futures.len())));
        while let Some(output) = processing.next().await {
            yield output;
            // Pop-n-push, but FIFO instead of LIFO.
            if !futures.is_empty() {
                processing.push(futures.remove(0));
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_bounded_yields_in_completion_order() {
        let delays = [30u64, 10, 20];
        let futures: Vec<_> = delays
            .iter()
            .map(|&delay| async move {
                tokio::time::sleep(Duration::from_millis(delay)).await;
                delay
            })
            .collect();
        let outputs: Vec<u64> = bounded(futures, 8).collect().await;
        assert_eq!(outputs, vec![10, 20, 30]);
    }

    #[tokio::test]
    async fn test_bounded_caps_futures_in_flight() {
        let (active, peak) = (AtomicUsize::new(0), AtomicUsize::new(0));
        let (active_ref, peak_ref) = (&active, &peak);
        let futures: Vec<_> = (0..20)
            .map(|_| async move {
                let (active, peak) = (active_ref, peak_ref);
                let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
                active.fetch_sub(1, Ordering::SeqCst);
            })
            .collect();
        assert_eq!(bounded(futures, MAX_PUBLISH_CONCURRENCY).count().await, 20);
        assert_eq!(peak.load(Ordering::SeqCst), MAX_PUBLISH_CONCURRENCY);
    }

    #[tokio::test]
    async fn test_bounded_limit_of_one_is_sequential() {
        let futures: Vec<_> = (0..5).map(|i| async move { i }).collect();
        let outputs: Vec<i32> = bounded(futures, 1).collect().await;
        assert_eq!(outputs, vec![0, 1, 2, 3, 4]);
    }
}
