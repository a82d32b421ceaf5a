//! Chunked remote fetching
//!
//! Identifier sets are split into chunks, each chunk is substituted into a
//! query template and sent to the endpoint. Chunks are fetched strictly one
//! after another.

use std::sync::Arc;

use indexmap::IndexSet;
use tracing::debug;

use super::channel::BatchSender;
use super::queries::QueryTemplate;
use super::reporter::Reporter;
use super::CancelFlag;
use crate::error::MirrorResult;
use crate::remote::{Binding, GraphClient};
use crate::term::{canonicalize_blank_nodes, Iri};

#[derive(Clone)]
pub struct ChunkedFetcher {
    client: Arc<dyn GraphClient>,
    reporter: Arc<dyn Reporter>,
    cancel: CancelFlag,
}

impl ChunkedFetcher {
    pub fn new(client: Arc<dyn GraphClient>, reporter: Arc<dyn Reporter>, cancel: CancelFlag) -> Self {
        ChunkedFetcher { client, reporter, cancel }
    }

    /// Run a CONSTRUCT template once per chunk and queue every result batch
    ///
    /// Blank nodes are relabeled per response before queuing. Returns the number of statements queued. Waits whenever the channel
    /// is full.
    pub async fn construct_chunked(
        &self,
        label: &str,
        ids: &[Iri],
        template: &QueryTemplate,
        chunk_size: usize,
        sink: &BatchSender,
    ) -> MirrorResult<usize> {
        let total = ids.len();
        let mut done = 0;
        let mut queued = 0;

        for chunk in ids.chunks(chunk_size.max(1)) {
            self.cancel.check(label)?;
            let triples = canonicalize_blank_nodes(self.client.construct(&template.render(chunk)).await?);
            debug!(template = template.name(), ids = chunk.len(), triples = triples.len(), "chunk fetched");
            queued += triples.len();
            sink.send(triples).await?;

            done += chunk.len();
            self.reporter.progress(label, done, total);
        }

        Ok(queued)
    }

    /// Run a SELECT template once per chunk and collect one identifier
    /// column
    ///
    /// Rows whose `variable` is not an IRI are reported and skipped.
    pub async fn select_chunked(
        &self,
        label: &str,
        ids: &[Iri],
        template: &QueryTemplate,
        chunk_size: usize,
        variable: &str,
    ) -> MirrorResult<IndexSet<Iri>> {
        let total = ids.len();
        let mut done = 0;
        let mut found = IndexSet::new();

        for chunk in ids.chunks(chunk_size.max(1)) {
            self.cancel.check(label)?;
            let rows = self.client.select(&template.render(chunk)).await?;
            debug!(template = template.name(), ids = chunk.len(), rows = rows.len(), "chunk selected");
            self.collect(&rows, template, variable, &mut found);

            done += chunk.len();
            self.reporter.progress(label, done, total);
        }

        Ok(found)
    }

    /// Run an unparametrized CONSTRUCT and queue the result as one batch
    pub async fn construct_all(&self, label: &str, template: &QueryTemplate, sink: &BatchSender) -> MirrorResult<usize> {
        self.cancel.check(label)?;
        let triples = canonicalize_blank_nodes(self.client.construct(template.text()).await?);
        let queued = triples.len();
        debug!(template = template.name(), triples = queued, "fetched");
        sink.send(triples).await?;
        Ok(queued)
    }

    /// Run an unparametrized SELECT and collect one identifier column
    pub async fn select_all(&self, label: &str, template: &QueryTemplate, variable: &str) -> MirrorResult<IndexSet<Iri>> {
        self.cancel.check(label)?;
        let rows = self.client.select(template.text()).await?;
        let mut found = IndexSet::with_capacity(rows.len());
        self.collect(&rows, template, variable, &mut found);
        Ok(found)
    }

    fn collect(&self, rows: &[Binding], template: &QueryTemplate, variable: &str, into: &mut IndexSet<Iri>) {
        for row in rows {
            match row.iri(variable, template.name()) {
                Ok(iri) => {
                    into.insert(iri);
                }
                Err(shape) => self.reporter.warning(&shape),
            }
        }
    }
}
