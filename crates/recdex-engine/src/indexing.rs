//! Asynchronous bulk submission.
//!
//! Documents accepted by [`IndexingCoordinator::submit`] are handed to a
//! dedicated worker thread over a channel and transmitted to the backend in
//! batches, triggered by buffered-document count or elapsed time. Transport
//! failures on that path are captured by the worker and only become
//! observable through [`IndexingCoordinator::close`].

use crossbeam_channel::{bounded, unbounded, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use recdex_core::config::EngineConfig;
use recdex_core::error::{Error, Result};
use recdex_core::traits::SearchBackend;
use recdex_core::types::{CrudType, Document, IndexingMode, Record, RecordSchema};

use crate::convert::DocumentConverter;

/// Bulk-channel flush triggers.
#[derive(Debug, Clone)]
pub struct BulkConfig {
    /// Flush once this many writes are buffered.
    pub flush_max_docs: usize,
    /// Flush once this much time has passed with writes buffered.
    pub flush_interval: Duration,
}

impl Default for BulkConfig {
    fn default() -> Self {
        Self { flush_max_docs: 1000, flush_interval: Duration::from_millis(1000) }
    }
}

impl From<&EngineConfig> for BulkConfig {
    fn from(config: &EngineConfig) -> Self {
        Self { flush_max_docs: config.flush_max_docs, flush_interval: config.flush_interval() }
    }
}

/// One backend write queued on the bulk channel.
#[derive(Debug, Clone)]
enum BulkOp {
    Index(Document),
    Delete { record_type: String, id: String },
}

enum BulkMessage {
    Op(BulkOp),
    /// Flush buffered writes, refresh, and acknowledge the barrier.
    Flush(Sender<Result<()>>),
    /// Drain, refresh, and acknowledge with the earliest captured failure.
    Close(Sender<Result<()>>),
}

struct BulkChannel {
    sender: Sender<BulkMessage>,
    worker: Option<JoinHandle<()>>,
}

impl BulkChannel {
    fn spawn(backend: Arc<dyn SearchBackend>, index_name: String, config: BulkConfig) -> Self {
        let (sender, receiver) = unbounded::<BulkMessage>();
        let worker = thread::spawn(move || {
            let mut buffer: Vec<BulkOp> = Vec::new();
            // earliest transport failure, reported at close
            let mut captured: Option<Error> = None;
            let mut failed = 0usize;
            let mut last_flush = Instant::now();
            loop {
                match receiver.recv_timeout(config.flush_interval) {
                    Ok(BulkMessage::Op(op)) => {
                        buffer.push(op);
                        if buffer.len() >= config.flush_max_docs
                            || last_flush.elapsed() >= config.flush_interval
                        {
                            let _ = flush(
                                backend.as_ref(),
                                &index_name,
                                &mut buffer,
                                &mut captured,
                                &mut failed,
                            );
                            last_flush = Instant::now();
                        }
                    }
                    Ok(BulkMessage::Flush(ack)) => {
                        let outcome = flush(
                            backend.as_ref(),
                            &index_name,
                            &mut buffer,
                            &mut captured,
                            &mut failed,
                        )
                        .and_then(|()| backend.refresh(&index_name));
                        last_flush = Instant::now();
                        let _ = ack.send(outcome);
                    }
                    Ok(BulkMessage::Close(ack)) => {
                        let drained = flush(
                            backend.as_ref(),
                            &index_name,
                            &mut buffer,
                            &mut captured,
                            &mut failed,
                        )
                        .and_then(|()| backend.refresh(&index_name));
                        let outcome = match captured.take() {
                            Some(err) => Err(err),
                            None => drained,
                        };
                        if failed > 0 {
                            tracing::error!(failed, "bulk channel closed with unacknowledged writes");
                        }
                        let _ = ack.send(outcome);
                        return;
                    }
                    Err(RecvTimeoutError::Timeout) => {
                        if buffer.is_empty() {
                            last_flush = Instant::now();
                        } else if last_flush.elapsed() >= config.flush_interval {
                            let _ = flush(
                                backend.as_ref(),
                                &index_name,
                                &mut buffer,
                                &mut captured,
                                &mut failed,
                            );
                            last_flush = Instant::now();
                        }
                    }
                    Err(RecvTimeoutError::Disconnected) => {
                        // channel dropped without close: drain what we can so
                        // no accepted write is silently discarded
                        let _ = flush(
                            backend.as_ref(),
                            &index_name,
                            &mut buffer,
                            &mut captured,
                            &mut failed,
                        );
                        let _ = backend.refresh(&index_name);
                        if let Some(err) = captured {
                            tracing::error!(error = %err, failed, "bulk channel dropped with failed writes");
                        }
                        return;
                    }
                }
            }
        });
        Self { sender, worker: Some(worker) }
    }

    fn send(&self, op: BulkOp) -> Result<()> {
        self.sender
            .send(BulkMessage::Op(op))
            .map_err(|_| Error::IndexUnavailable("bulk channel disconnected".to_string()))
    }

    /// Read-after-write barrier: blocks until every write accepted so far is
    /// visible to searches.
    fn flush_and_refresh(&self) -> Result<()> {
        let (ack_tx, ack_rx) = bounded(1);
        self.sender
            .send(BulkMessage::Flush(ack_tx))
            .map_err(|_| Error::IndexUnavailable("bulk channel disconnected".to_string()))?;
        ack_rx
            .recv()
            .map_err(|_| Error::IndexUnavailable("bulk worker terminated".to_string()))?
    }

    fn close(mut self, timeout: Duration) -> Result<()> {
        let (ack_tx, ack_rx) = bounded(1);
        self.sender
            .send(BulkMessage::Close(ack_tx))
            .map_err(|_| Error::IndexUnavailable("bulk channel disconnected".to_string()))?;
        match ack_rx.recv_timeout(timeout) {
            Ok(outcome) => {
                if let Some(worker) = self.worker.take() {
                    let _ = worker.join();
                }
                outcome
            }
            // the worker stays detached; it may still be mid-flush
            Err(_) => Err(Error::CloseTimeout(timeout)),
        }
    }
}

fn flush(
    backend: &dyn SearchBackend,
    index_name: &str,
    buffer: &mut Vec<BulkOp>,
    captured: &mut Option<Error>,
    failed: &mut usize,
) -> Result<()> {
    if buffer.is_empty() {
        return Ok(());
    }
    let count = buffer.len();
    let mut first: Option<Error> = None;
    for op in buffer.drain(..) {
        let outcome = match op {
            BulkOp::Index(doc) => backend.index(index_name, &doc),
            BulkOp::Delete { record_type, id } => backend.delete(index_name, &record_type, &id),
        };
        if let Err(err) = outcome {
            *failed += 1;
            tracing::warn!(error = %err, "bulk write failed");
            if first.is_none() {
                first = Some(err);
            }
        }
    }
    tracing::debug!(count, "bulk batch flushed");
    match first {
        Some(err) => {
            if captured.is_none() {
                *captured = Some(err.clone());
            }
            Err(err)
        }
        None => Ok(()),
    }
}

/// Outcome of a submit call: writes accepted by the channel plus per-record
/// conversion rejections as (position in the submitted slice, error) pairs.
#[derive(Debug, Default)]
pub struct SubmitSummary {
    pub accepted: usize,
    pub rejected: Vec<(usize, Error)>,
}

/// Converts records and submits backend writes through the bulk channel.
///
/// Everything the coordinator needs is injected at construction; there is no
/// process-wide channel factory.
pub struct IndexingCoordinator {
    backend: Arc<dyn SearchBackend>,
    channel: BulkChannel,
    converter: DocumentConverter,
    index_name: String,
}

impl IndexingCoordinator {
    pub fn new(
        backend: Arc<dyn SearchBackend>,
        index_name: impl Into<String>,
        config: BulkConfig,
    ) -> Self {
        let index_name = index_name.into();
        let channel = BulkChannel::spawn(Arc::clone(&backend), index_name.clone(), config);
        Self { backend, channel, converter: DocumentConverter::new(), index_name }
    }

    pub fn index_name(&self) -> &str {
        &self.index_name
    }

    /// Convert and enqueue a batch of records.
    ///
    /// Returns once every convertible record is accepted into the channel,
    /// not once durably indexed. Records that fail conversion are rejected
    /// individually without blocking the rest of the batch. With `refresh`,
    /// blocks until the backend has made the accepted writes visible.
    pub fn submit(
        &self,
        records: &[Record],
        schema: &RecordSchema,
        mode: IndexingMode,
        refresh: bool,
    ) -> Result<SubmitSummary> {
        let crud_type = mode.crud_type();
        let mut summary = SubmitSummary::default();
        for (position, record) in records.iter().enumerate() {
            match self.bulk_op(record, schema, crud_type) {
                Ok(op) => {
                    self.channel.send(op)?;
                    summary.accepted += 1;
                }
                Err(err) => summary.rejected.push((position, err)),
            }
        }
        if refresh {
            self.channel.flush_and_refresh()?;
        }
        Ok(summary)
    }

    fn bulk_op(
        &self,
        record: &Record,
        schema: &RecordSchema,
        crud_type: CrudType,
    ) -> Result<BulkOp> {
        match crud_type {
            CrudType::Insert | CrudType::Upsert => {
                Ok(BulkOp::Index(self.converter.to_document(record, schema)?))
            }
            CrudType::Remove => Ok(BulkOp::Delete {
                record_type: record.record_type.clone(),
                id: self.converter.identifier(record, schema)?,
            }),
        }
    }

    /// Read-after-write barrier on the backend index. Does not flush the
    /// channel; use `submit(.., refresh = true)` for that.
    pub fn refresh(&self) -> Result<()> {
        self.backend.refresh(&self.index_name)
    }

    /// Drain the bulk channel, bounded by `timeout`.
    ///
    /// A timeout or a captured transport failure means previously submitted
    /// writes may not have committed; callers must not assume earlier
    /// `submit` calls succeeded merely because they returned.
    pub fn close(self, timeout: Duration) -> Result<()> {
        self.channel.close(timeout)
    }
}
