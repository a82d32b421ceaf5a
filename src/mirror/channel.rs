//! Bounded ingestion channel between the fetch phases and the Writer
//!
//! The channel is FIFO and holds at most `capacity` messages. A producer that
//! finds it full waits; nothing is ever dropped. Dropping the
//! [`BatchSender`] closes the channel: the Writer drains what is queued and
//! then stops.

use tokio::sync::{mpsc, oneshot};

use crate::error::{MirrorError, MirrorResult};
use crate::term::Triple;

/// Statements produced by one chunk query
pub type StatementBatch = Vec<Triple>;

/// A message for the Writer
#[derive(Debug)]
pub enum WriterMessage {
    /// Commit these statements
    Batch(StatementBatch),
    /// Reply with the store size once everything queued before is committed
    Barrier(oneshot::Sender<usize>),
}

/// Create the channel for one run
pub fn ingestion_channel(capacity: usize) -> (BatchSender, BatchReceiver) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (BatchSender { tx }, BatchReceiver { rx })
}

/// Producer half, owned by the orchestrator
#[derive(Debug)]
pub struct BatchSender {
    tx: mpsc::Sender<WriterMessage>,
}

impl BatchSender {
    /// Queue a batch, waiting while the channel is full
    pub async fn send(&self, batch: StatementBatch) -> MirrorResult<()> {
        self.tx
            .send(WriterMessage::Batch(batch))
            .await
            .map_err(|_| MirrorError::ChannelClosed)
    }

    /// Wait until every batch sent so far is committed
    ///
    /// Returns the store size observed by the Writer at that point.
    pub async fn barrier(&self) -> MirrorResult<usize> {
        let (ack, done) = oneshot::channel();
        self.tx
            .send(WriterMessage::Barrier(ack))
            .await
            .map_err(|_| MirrorError::ChannelClosed)?;
        done.await.map_err(|_| MirrorError::ChannelClosed)
    }
}

/// Consumer half, owned by the Writer
#[derive(Debug)]
pub struct BatchReceiver {
    rx: mpsc::Receiver<WriterMessage>,
}

impl BatchReceiver {
    pub async fn recv(&mut self) -> Option<WriterMessage> {
        self.rx.recv().await
    }

    /// Blocking receive for use on a blocking thread
    ///
    /// Returns `None` once the channel is closed and drained.
    pub fn blocking_recv(&mut self) -> Option<WriterMessage> {
        self.rx.blocking_recv()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::term::Term;
    use std::time::Duration;
    use tokio::time::timeout;

    fn batch(n: usize) -> StatementBatch {
        (0..n)
            .map(|i| {
                Triple::new(
                    Term::iri(format!("http://www.wikidata.org/entity/Q{}", i)),
                    Term::iri("http://www.wikidata.org/prop/direct/P31"),
                    Term::iri("http://www.wikidata.org/entity/Q16521"),
                )
            })
            .collect()
    }

    #[tokio::test]
    async fn test_send_blocks_when_full() {
        let k = 3;
        let (tx, mut rx) = ingestion_channel(k);

        for _ in 0..k {
            tx.send(batch(1)).await.unwrap();
        }

        // The (k+1)-th send waits while the consumer is stalled
        let stalled = timeout(Duration::from_millis(50), tx.send(batch(1))).await;
        assert!(stalled.is_err());

        // and completes once one slot is drained
        assert!(matches!(rx.recv().await, Some(WriterMessage::Batch(_))));
        timeout(Duration::from_millis(500), tx.send(batch(1)))
            .await
            .expect("send should resume after a receive")
            .unwrap();
    }

    #[tokio::test]
    async fn test_fifo_and_close() {
        let (tx, mut rx) = ingestion_channel(4);
        tx.send(batch(1)).await.unwrap();
        tx.send(batch(2)).await.unwrap();
        drop(tx);

        let sizes: Vec<usize> = std::iter::from_fn(|| match rx.rx.try_recv() {
            Ok(WriterMessage::Batch(b)) => Some(b.len()),
            _ => None,
        })
        .collect();
        assert_eq!(sizes, vec![1, 2]);
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_send_after_receiver_dropped() {
        let (tx, rx) = ingestion_channel(1);
        drop(rx);
        assert!(matches!(tx.send(batch(1)).await, Err(MirrorError::ChannelClosed)));
        assert!(matches!(tx.barrier().await, Err(MirrorError::ChannelClosed)));
    }

    #[tokio::test]
    async fn test_barrier_is_acknowledged() {
        let (tx, mut rx) = ingestion_channel(2);
        let consumer = tokio::spawn(async move {
            let mut seen = 0;
            while let Some(msg) = rx.recv().await {
                match msg {
                    WriterMessage::Batch(b) => seen += b.len(),
                    WriterMessage::Barrier(ack) => {
                        let _ = ack.send(seen);
                    }
                }
            }
            seen
        });

        tx.send(batch(2)).await.unwrap();
        tx.send(batch(3)).await.unwrap();
        assert_eq!(tx.barrier().await.unwrap(), 5);
        drop(tx);
        assert_eq!(consumer.await.unwrap(), 5);
    }
}
