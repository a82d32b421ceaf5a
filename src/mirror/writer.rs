//! The single Writer task
//!
//! The Writer owns the only writable connection to the local store for the
//! whole run. It commits batches in the order they were queued, each in its
//! own transaction, and returns once the channel is closed and drained.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::channel::{BatchReceiver, WriterMessage};
use super::reporter::Reporter;
use crate::error::{MirrorError, MirrorResult};
use crate::store::{IsolationLevel, LocalStore, StoreError};
use crate::term::Triple;

/// What the Writer did during a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriterStats {
    /// Batches committed
    pub batches: usize,
    /// Statements that were new to the store
    pub inserted: usize,
    /// Store size after the last batch
    pub final_len: usize,
}

pub struct Writer {
    store: LocalStore,
    rx: BatchReceiver,
    reporter: Arc<dyn Reporter>,
    isolation: IsolationLevel,
    retries: u32,
    backoff: Duration,
}

impl Writer {
    pub fn new(store: LocalStore, rx: BatchReceiver, reporter: Arc<dyn Reporter>) -> Self {
        Writer {
            store,
            rx,
            reporter,
            isolation: IsolationLevel::ReadUncommitted,
            retries: 0,
            backoff: Duration::ZERO,
        }
    }

    pub fn with_isolation(mut self, isolation: IsolationLevel) -> Self {
        self.isolation = isolation;
        self
    }

    /// Retry a failed commit up to `retries` times, waiting
    /// `backoff * attempt` before each attempt
    pub fn with_retries(mut self, retries: u32, backoff: Duration) -> Self {
        self.retries = retries;
        self.backoff = backoff;
        self
    }

    /// Run the Writer on the blocking thread pool
    pub fn spawn(self) -> JoinHandle<MirrorResult<WriterStats>> {
        tokio::task::spawn_blocking(move || self.run())
    }

    /// Drain the channel until it is closed
    ///
    /// A batch that still fails after all retries stops the Writer; dropping
    /// the receiver then makes the producer's next send fail.
    pub fn run(mut self) -> MirrorResult<WriterStats> {
        let mut stats = WriterStats::default();

        while let Some(msg) = self.rx.blocking_recv() {
            match msg {
                WriterMessage::Batch(batch) => {
                    let inserted = self.commit(&batch)?;
                    stats.batches += 1;
                    stats.inserted += inserted;
                    self.reporter.committed(batch.len(), inserted, stats.inserted);
                }
                WriterMessage::Barrier(ack) => {
                    let len = self.store.len()?;
                    debug!(len, "barrier reached");
                    // The orchestrator may have given up waiting
                    let _ = ack.send(len);
                }
            }
        }

        self.store.checkpoint()?;
        stats.final_len = self.store.len()?;
        Ok(stats)
    }

    fn commit(&self, batch: &[Triple]) -> MirrorResult<usize> {
        let mut attempt: u32 = 0;
        loop {
            match self.store.insert_batch(batch, self.isolation) {
                Ok(inserted) => return Ok(inserted),
                Err(e) if attempt < self.retries && is_transient(&e) => {
                    attempt += 1;
                    let wait = self.backoff * attempt;
                    warn!(attempt, wait_ms = wait.as_millis() as u64, error = %e, "batch commit failed, retrying");
                    std::thread::sleep(wait);
                }
                Err(source) => {
                    return Err(MirrorError::LocalStoreWrite {
                        attempts: attempt + 1,
                        source,
                    })
                }
            }
        }
    }
}

fn is_transient(e: &StoreError) -> bool {
    matches!(e, StoreError::Database(_) | StoreError::Io(_))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::UnexpectedBindingShape;
    use crate::mirror::channel::ingestion_channel;
    use crate::term::Term;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingReporter {
        commits: AtomicUsize,
    }

    impl Reporter for CountingReporter {
        fn progress(&self, _: &str, _: usize, _: usize) {}
        fn warning(&self, _: &UnexpectedBindingShape) {}
        fn committed(&self, _: usize, _: usize, _: usize) {
            self.commits.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn statement(s: &str, o: &str) -> Triple {
        Triple::new(
            Term::iri(format!("http://www.wikidata.org/entity/{}", s)),
            Term::iri("http://www.wikidata.org/prop/direct/P171"),
            Term::iri(format!("http://www.wikidata.org/entity/{}", o)),
        )
    }

    #[tokio::test]
    async fn test_drains_then_returns() {
        let reporter = Arc::new(CountingReporter::default());
        let (tx, rx) = ingestion_channel(1);
        let store = LocalStore::in_memory().unwrap();
        let handle = Writer::new(store, rx, reporter.clone()).spawn();

        tx.send(vec![statement("Q1", "Q2")]).await.unwrap();
        tx.send(vec![statement("Q2", "Q3"), statement("Q1", "Q2")]).await.unwrap();
        assert_eq!(tx.barrier().await.unwrap(), 2);
        tx.send(vec![statement("Q3", "Q4")]).await.unwrap();
        drop(tx);

        let stats = handle.await.unwrap().unwrap();
        assert_eq!(stats, WriterStats { batches: 3, inserted: 3, final_len: 3 });
        assert_eq!(reporter.commits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_bad_batch_fails_without_retry() {
        let (tx, rx) = ingestion_channel(1);
        let store = LocalStore::in_memory().unwrap();
        let handle = Writer::new(store, rx, Arc::new(CountingReporter::default()))
            .with_retries(5, Duration::from_millis(1))
            .spawn();

        let pattern = Triple::new(Term::var("s"), Term::iri("http://www.wikidata.org/prop/direct/P171"), Term::var("o"));
        tx.send(vec![pattern]).await.unwrap();

        match handle.await.unwrap() {
            Err(MirrorError::LocalStoreWrite { attempts, source: StoreError::NonGround(_) }) => assert_eq!(attempts, 1),
            other => panic!("expected LocalStoreWrite, got {:?}", other),
        }
        // The receiver is gone, so the producer sees a closed channel
        assert!(matches!(tx.send(vec![statement("Q1", "Q2")]).await, Err(MirrorError::ChannelClosed)));
    }

    #[tokio::test]
    async fn test_empty_run() {
        let (tx, rx) = ingestion_channel(1);
        let handle = Writer::new(LocalStore::in_memory().unwrap(), rx, Arc::new(CountingReporter::default())).spawn();
        drop(tx);
        assert_eq!(handle.await.unwrap().unwrap(), WriterStats::default());
    }
}
