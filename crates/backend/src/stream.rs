use crate::error::{BackendError, Result};
use tokio::sync::mpsc;

/// Fragments buffered between producer and consumer. Small on purpose: a
/// lagging consumer should stall the HTTP read, not grow a queue.
pub const TOKEN_CHANNEL_CAPACITY: usize = 64;

/// Producer half handed to whatever feeds the stream.
pub struct TokenSender {
    tx: mpsc::Sender<Result<String>>,
}

impl TokenSender {
    /// Push one text fragment. Awaits when the consumer lags (backpressure).
    /// Returns `false` when the consumer is gone and production should stop.
    pub async fn send(&self, fragment: String) -> bool {
        self.tx.send(Ok(fragment)).await.is_ok()
    }

    /// Terminate the stream with an error.
    pub async fn fail(&self, error: BackendError) {
        let _ = self.tx.send(Err(error)).await;
    }
}

/// Consumer half: an async pull loop over text fragments.
///
/// The stream ends when [`TokenStream::next`] returns `None` (the producer
/// finished) or yields an `Err` (the producer failed). Dropping the stream
/// early cancels the producer via the closed channel.
pub struct TokenStream {
    rx: mpsc::Receiver<Result<String>>,
}

impl TokenStream {
    pub async fn next(&mut self) -> Option<Result<String>> {
        self.rx.recv().await
    }

    /// Drain the stream into the complete response text.
    pub async fn collect(mut self) -> Result<String> {
        let mut out = String::new();
        while let Some(fragment) = self.next().await {
            out.push_str(&fragment?);
        }
        Ok(out)
    }
}

/// Create a bounded producer/consumer pair.
pub fn token_channel(capacity: usize) -> (TokenSender, TokenStream) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (TokenSender { tx }, TokenStream { rx })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn collect_concatenates_fragments_in_order() {
        let (tx, stream) = token_channel(4);
        tokio::spawn(async move {
            for piece in ["Hello", ", ", "world"] {
                assert!(tx.send(piece.to_string()).await);
            }
        });
        assert_eq!(stream.collect().await.unwrap(), "Hello, world");
    }

    #[tokio::test]
    async fn producer_error_surfaces_to_collector() {
        let (tx, stream) = token_channel(4);
        tokio::spawn(async move {
            tx.send("partial".to_string()).await;
            tx.fail(BackendError::Stream {
                reason: "connection reset".to_string(),
            })
            .await;
        });
        assert!(stream.collect().await.is_err());
    }

    #[tokio::test]
    async fn dropped_consumer_stops_the_producer() {
        let (tx, stream) = token_channel(1);
        drop(stream);
        assert!(!tx.send("ignored".to_string()).await);
    }
}
