use std::{
    pin::Pin,
    task::{Context, Poll},
};

use futures::Stream as FuturesStream;

/// Wraps an SSE event stream and fires `shutdown_tx` once the stream ends or
/// is dropped, so the session task behind it can stop.
pub struct CleanupStream<S> {
    pub inner: S,
    pub shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl<S> CleanupStream<S> {
    pub fn new(inner: S, shutdown_tx: tokio::sync::oneshot::Sender<()>) -> Self {
        Self {
            inner,
            shutdown_tx: Some(shutdown_tx),
        }
    }

    fn notify(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl<S, T, E> FuturesStream for CleanupStream<S>
where
    S: FuturesStream<Item = Result<T, E>> + Unpin,
{
    type Item = Result<T, E>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let poll = Pin::new(&mut self.inner).poll_next(cx);
        if let Poll::Ready(None) = poll {
            self.notify();
        }
        poll
    }
}

// axum drops the body stream when the client goes away
impl<S> Drop for CleanupStream<S> {
    fn drop(&mut self) {
        self.notify();
    }
}

#[cfg(test)]
mod tests {
    use futures::{StreamExt, stream};
    use tokio::sync::oneshot;

    use super::*;

    #[tokio::test]
    async fn test_signals_on_end_of_stream() {
        let (tx, mut rx) = oneshot::channel();
        let mut s = CleanupStream::new(stream::iter(vec![Ok::<u8, ()>(1)]), tx);
        assert_eq!(s.next().await, Some(Ok(1)));
        assert!(rx.try_recv().is_err());
        assert_eq!(s.next().await, None);
        assert!(rx.try_recv().is_ok());
    }

    #[tokio::test]
    async fn test_signals_on_drop() {
        let (tx, rx) = oneshot::channel();
        let s = CleanupStream::new(stream::pending::<Result<u8, ()>>(), tx);
        drop(s);
        assert!(rx.await.is_ok());
    }
}
