//! The mirroring pipeline
//!
//! A run walks a fixed sequence of phases:
//!
//! ```text
//! Idle -> Discovering -> ImportingRanks -> ClosingTaxonomy -> FetchingTaxa
//!      -> FetchingCompounds -> FetchingReferences -> Draining -> Done
//! ```
//!
//! Two tasks are involved. The producer (this module) runs the phases one
//! after another and pushes statement batches into a bounded channel; the
//! [`Writer`] drains the channel into the local store. Every phase depends
//! on what the previous ones committed, so phases never overlap.
//!
//! ```ignore
//! use std::sync::Arc;
//! use kgmirror::{config::MirrorConfig, remote::SparqlClient, mirror::Mirror};
//!
//! let config = MirrorConfig::load()?;
//! let client = Arc::new(SparqlClient::from_config(&config.endpoint)?);
//! let report = Mirror::new(client, config).run().await?;
//! println!("{} statements", report.store_len);
//! ```

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use indexmap::IndexSet;
use tracing::{debug, info};

use crate::config::MirrorConfig;
use crate::error::{MirrorError, MirrorResult};
use crate::remote::GraphClient;
use crate::store::LocalStore;
use crate::term::Iri;
use crate::vocab::EntityKind;

pub mod channel;
pub mod closure;
pub mod fetcher;
pub mod queries;
pub mod reporter;
pub mod writer;

pub use channel::{ingestion_channel, BatchReceiver, BatchSender, StatementBatch, WriterMessage};
pub use closure::{derive_working_sets, resolve_parent_closure, WorkingSets};
pub use fetcher::ChunkedFetcher;
pub use queries::QueryTemplate;
pub use reporter::{Reporter, TracingReporter};
pub use writer::{Writer, WriterStats};

// ============================================================================
// Phases
// ============================================================================

/// Where a run currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum Phase {
    #[default]
    Idle,
    Discovering,
    ImportingRanks,
    ClosingTaxonomy,
    FetchingTaxa,
    FetchingCompounds,
    FetchingReferences,
    Draining,
    Done,
}

impl Phase {
    /// The phase that follows; `Done` is terminal
    pub fn next(self) -> Phase {
        match self {
            Phase::Idle => Phase::Discovering,
            Phase::Discovering => Phase::ImportingRanks,
            Phase::ImportingRanks => Phase::ClosingTaxonomy,
            Phase::ClosingTaxonomy => Phase::FetchingTaxa,
            Phase::FetchingTaxa => Phase::FetchingCompounds,
            Phase::FetchingCompounds => Phase::FetchingReferences,
            Phase::FetchingReferences => Phase::Draining,
            Phase::Draining | Phase::Done => Phase::Done,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Idle => "Idle",
            Phase::Discovering => "Discovering",
            Phase::ImportingRanks => "ImportingRanks",
            Phase::ClosingTaxonomy => "ClosingTaxonomy",
            Phase::FetchingTaxa => "FetchingTaxa",
            Phase::FetchingCompounds => "FetchingCompounds",
            Phase::FetchingReferences => "FetchingReferences",
            Phase::Draining => "Draining",
            Phase::Done => "Done",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Cancellation
// ============================================================================

/// Shared cancellation signal
///
/// Checked before every phase and every chunk. A cancelled run still closes
/// the channel and waits for the Writer before returning.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Fail with [`MirrorError::Cancelled`] once cancelled
    pub fn check(&self, during: &str) -> MirrorResult<()> {
        if self.is_cancelled() {
            return Err(MirrorError::Cancelled(during.to_string()));
        }
        Ok(())
    }
}

// ============================================================================
// Run state and report
// ============================================================================

/// Summary of a completed run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MirrorReport {
    /// Compounds the remote discovery query returned
    pub discovered_compounds: usize,
    /// Occurrences read back from the local store
    pub occurrences: usize,
    /// Compounds fetched in FetchingCompounds
    pub compounds: usize,
    /// Taxa before the parent closure
    pub seed_taxa: usize,
    /// Taxa fetched in FetchingTaxa
    pub extended_taxa: usize,
    /// References fetched in FetchingReferences
    pub references: usize,
    /// Batches the Writer committed
    pub batches: usize,
    /// Statements that were new to the store
    pub inserted: usize,
    /// Local store size at the end of the run
    pub store_len: usize,
    pub elapsed: Duration,
}

/// Data handed from one phase to the next
#[derive(Debug, Default)]
struct RunState {
    phase: Phase,
    discovered: IndexSet<Iri>,
    working: WorkingSets,
    extended_taxa: IndexSet<Iri>,
}

// ============================================================================
// Orchestrator
// ============================================================================

/// Runs one full mirror
pub struct Mirror {
    client: Arc<dyn GraphClient>,
    config: MirrorConfig,
    reporter: Arc<dyn Reporter>,
    cancel: CancelFlag,
}

/// Run one full mirror with default reporting
pub async fn mirror(client: Arc<dyn GraphClient>, config: MirrorConfig) -> MirrorResult<MirrorReport> {
    Mirror::new(client, config).run().await
}

impl Mirror {
    pub fn new(client: Arc<dyn GraphClient>, config: MirrorConfig) -> Self {
        Mirror {
            client,
            config,
            reporter: Arc::new(TracingReporter::new()),
            cancel: CancelFlag::new(),
        }
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn Reporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    /// Run every phase, then close the channel and wait for the Writer
    ///
    /// The Writer is joined on every path, so when this returns no batch is
    /// still in flight. On failure whatever was committed stays in the
    /// store.
    pub async fn run(&self) -> MirrorResult<MirrorReport> {
        self.config.validate()?;
        let started = Instant::now();
        let pipeline = &self.config.mirror;

        let store =
            LocalStore::open(&self.config.store.path)?.with_term_cache_capacity(self.config.store.term_cache_capacity);
        let (sink, rx) = ingestion_channel(pipeline.channel_capacity);
        let writer = Writer::new(store, rx, Arc::clone(&self.reporter))
            .with_isolation(self.config.store.isolation)
            .with_retries(pipeline.write_retries, Duration::from_millis(pipeline.retry_backoff_ms))
            .spawn();

        let mut state = RunState::default();
        // `produce` owns the sender; the channel closes when it returns.
        let produced = self.produce(&mut state, sink).await;

        self.enter(&mut state, Phase::Draining);
        let written = match writer.await {
            Ok(result) => result,
            Err(e) => Err(MirrorError::WriterFailed(e.to_string())),
        };

        let stats = match (produced, written) {
            (Ok(()), Ok(stats)) => stats,
            // The Writer stopped first; its error is the cause
            (Err(MirrorError::ChannelClosed), Err(e)) => return Err(e),
            (Err(e), _) | (Ok(()), Err(e)) => return Err(e),
        };

        self.enter(&mut state, Phase::Done);
        let report = MirrorReport {
            discovered_compounds: state.discovered.len(),
            occurrences: state.working.occurrences,
            compounds: state.working.compounds.len(),
            seed_taxa: state.working.taxa.len(),
            extended_taxa: state.extended_taxa.len(),
            references: state.working.references.len(),
            batches: stats.batches,
            inserted: stats.inserted,
            store_len: stats.final_len,
            elapsed: started.elapsed(),
        };
        info!(store_len = report.store_len, inserted = report.inserted, "mirror complete");
        Ok(report)
    }

    async fn produce(&self, state: &mut RunState, sink: BatchSender) -> MirrorResult<()> {
        let fetcher = ChunkedFetcher::new(Arc::clone(&self.client), Arc::clone(&self.reporter), self.cancel.clone());

        loop {
            let next = state.phase.next();
            if next == Phase::Draining {
                return Ok(());
            }
            self.cancel.check(next.as_str())?;
            self.enter(state, next);
            self.step(state, &fetcher, &sink).await?;
        }
    }

    fn enter(&self, state: &mut RunState, phase: Phase) {
        state.phase = phase;
        self.reporter.phase(phase);
    }

    async fn step(&self, state: &mut RunState, fetcher: &ChunkedFetcher, sink: &BatchSender) -> MirrorResult<()> {
        match state.phase {
            Phase::Discovering => self.discover(state, fetcher, sink).await,
            Phase::ImportingRanks => self.import_ranks(fetcher, sink).await,
            Phase::ClosingTaxonomy => self.close_taxonomy(state, fetcher).await,
            Phase::FetchingTaxa => {
                let taxa: Vec<Iri> = state.extended_taxa.iter().cloned().collect();
                self.fetch_properties(EntityKind::Taxon, &taxa, fetcher, sink).await
            }
            Phase::FetchingCompounds => {
                let compounds: Vec<Iri> = state.working.compounds.iter().cloned().collect();
                self.fetch_properties(EntityKind::Compound, &compounds, fetcher, sink).await
            }
            Phase::FetchingReferences => {
                let references: Vec<Iri> = state.working.references.iter().cloned().collect();
                self.fetch_properties(EntityKind::Reference, &references, fetcher, sink).await
            }
            Phase::Idle | Phase::Draining | Phase::Done => Ok(()),
        }
    }

    async fn discover(&self, state: &mut RunState, fetcher: &ChunkedFetcher, sink: &BatchSender) -> MirrorResult<()> {
        let occurrences = fetcher
            .construct_all("occurrences", &queries::compound_taxon_reference(), sink)
            .await?;
        state.discovered = fetcher
            .select_all("compounds", &queries::discover_compounds(), "compound")
            .await?;
        info!(occurrences, compounds = state.discovered.len(), "discovered");
        Ok(())
    }

    async fn import_ranks(&self, fetcher: &ChunkedFetcher, sink: &BatchSender) -> MirrorResult<()> {
        let ranks = fetcher.construct_all("ranks", &queries::taxonomic_ranks(), sink).await?;
        // Everything after this point reads what the first two phases wrote
        let store_len = sink.barrier().await?;
        info!(ranks, store_len, "taxonomic ranks imported");
        Ok(())
    }

    async fn close_taxonomy(&self, state: &mut RunState, fetcher: &ChunkedFetcher) -> MirrorResult<()> {
        let reader = LocalStore::open_reader(&self.config.store.path)?;
        let mut working = derive_working_sets(&reader)?;
        drop(reader);

        let before = working.compounds.len();
        working.compounds.retain(|c| state.discovered.contains(c));
        if working.compounds.len() < before {
            debug!(dropped = before - working.compounds.len(), "compounds outside this run's discovery");
        }

        state.extended_taxa =
            resolve_parent_closure(fetcher, &working.taxa, self.config.mirror.join_chunk_size).await?;
        info!(
            occurrences = working.occurrences,
            taxa = working.taxa.len(),
            extended_taxa = state.extended_taxa.len(),
            "taxonomy closed"
        );
        state.working = working;
        Ok(())
    }

    async fn fetch_properties(
        &self,
        kind: EntityKind,
        ids: &[Iri],
        fetcher: &ChunkedFetcher,
        sink: &BatchSender,
    ) -> MirrorResult<()> {
        let label = match kind {
            EntityKind::Taxon => "taxa",
            EntityKind::Compound => "compounds",
            EntityKind::Reference => "references",
        };
        let queued = fetcher
            .construct_chunked(label, ids, &queries::entity_properties(kind), self.config.mirror.flat_chunk_size, sink)
            .await?;
        info!(kind = %kind, entities = ids.len(), statements = queued, "properties fetched");
        Ok(())
    }
}
