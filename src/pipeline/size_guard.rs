//! Streaming response-size enforcement.
//!
//! [`LimitedBody`] wraps a byte stream and counts bytes as chunks arrive.
//! The first chunk that pushes the running total past the limit yields
//! [`EuroparlError::SizeLimitExceeded`] and the stream ends; the upstream is
//! never polled again. Dropping the wrapped stream at that point aborts the
//! underlying transfer, so an oversized body is never fully buffered.
//!
//! # Usage
//!
//! [`guard`] drives a body to completion under a limit and returns the
//! collected bytes. The fetch pipeline applies it to every response body.

use std::pin::{Pin, pin};
use std::task::{Context, Poll, ready};

use bytes::{Bytes, BytesMut};
use futures_util::{Stream, StreamExt};
use pin_project_lite::pin_project;

use crate::{EuroparlError, Result};

/// Default response budget: 10 MiB.
pub const DEFAULT_MAX_RESPONSE_BYTES: u64 = 10 * 1024 * 1024;

pin_project! {
    /// Byte stream that fails once more than `limit` bytes have passed.
    pub struct LimitedBody<S> {
        #[pin]
        inner: S,
        limit: u64,
        received: u64,
        done: bool,
    }
}

impl<S> LimitedBody<S> {
    pub fn new(inner: S, limit: u64) -> Self {
        Self {
            inner,
            limit,
            received: 0,
            done: false,
        }
    }

    /// Bytes seen so far, including the chunk that crossed the limit.
    pub fn received(&self) -> u64 {
        self.received
    }
}

impl<S, E> Stream for LimitedBody<S>
where
    S: Stream<Item = std::result::Result<Bytes, E>>,
    E: Into<EuroparlError>,
{
    type Item = Result<Bytes>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.project();
        if *this.done {
            return Poll::Ready(None);
        }
        match ready!(this.inner.poll_next(cx)) {
            Some(Ok(chunk)) => {
                *this.received += chunk.len() as u64;
                if *this.received > *this.limit {
                    *this.done = true;
                    return Poll::Ready(Some(Err(EuroparlError::SizeLimitExceeded {
                        limit: *this.limit,
                        received: *this.received,
                    })));
                }
                Poll::Ready(Some(Ok(chunk)))
            }
            Some(Err(e)) => {
                *this.done = true;
                Poll::Ready(Some(Err(e.into())))
            }
            None => {
                *this.done = true;
                Poll::Ready(None)
            }
        }
    }
}

/// Collect `body` into memory, rejecting it as soon as it exceeds `max_bytes`.
pub async fn guard<S, E>(body: S, max_bytes: u64) -> Result<Bytes>
where
    S: Stream<Item = std::result::Result<Bytes, E>>,
    E: Into<EuroparlError>,
{
    let mut limited = pin!(LimitedBody::new(body, max_bytes));
    let mut buf = BytesMut::new();
    while let Some(chunk) = limited.next().await {
        buf.extend_from_slice(&chunk?);
    }
    Ok(buf.freeze())
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::stream;

    fn chunks(sizes: &[usize]) -> impl Stream<Item = Result<Bytes>> {
        let items: Vec<Result<Bytes>> = sizes
            .iter()
            .map(|n| Ok(Bytes::from(vec![b'x'; *n])))
            .collect();
        stream::iter(items)
    }

    #[tokio::test]
    async fn exactly_at_limit_is_accepted() {
        let body = guard(chunks(&[4, 4, 2]), 10).await.unwrap();
        assert_eq!(body.len(), 10);
    }

    #[tokio::test]
    async fn one_byte_over_is_rejected() {
        let err = guard(chunks(&[4, 4, 3]), 10).await.unwrap_err();
        assert!(matches!(
            err,
            EuroparlError::SizeLimitExceeded {
                limit: 10,
                received: 11
            }
        ));
    }

    #[tokio::test]
    async fn upstream_errors_pass_through() {
        let items: Vec<Result<Bytes>> = vec![
            Ok(Bytes::from_static(b"ab")),
            Err(EuroparlError::Http("connection reset".into())),
        ];
        let err = guard(stream::iter(items), 10).await.unwrap_err();
        assert!(matches!(err, EuroparlError::Http(_)));
    }

    #[tokio::test]
    async fn stream_ends_after_rejection() {
        let mut limited = Box::pin(LimitedBody::new(chunks(&[8, 8, 8]), 10));
        assert!(limited.next().await.unwrap().is_ok());
        assert!(limited.next().await.unwrap().is_err());
        assert!(limited.next().await.is_none());
        assert_eq!(limited.received(), 16);
    }
}
