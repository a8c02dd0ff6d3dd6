//! Prometheus metrics and the sink that feeds them.
//!
//! The core only sees the [`ObservabilitySink`] port; this module provides
//! the prometheus-backed implementation plus a process-global registry.

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use prometheus::{Histogram, HistogramOpts, IntCounter, Registry};

use crate::ports::{IngestionStatus, ObservabilitySink};
use crate::types::SearchType;

/// Global metrics instance.
static METRICS: OnceLock<Arc<Metrics>> = OnceLock::new();

/// Get or initialize the global metrics instance.
pub fn get_metrics() -> Arc<Metrics> {
    METRICS.get_or_init(|| Arc::new(Metrics::new())).clone()
}

/// Default histogram buckets for latency tracking (in seconds).
/// Covers from 1ms to 10s with reasonable granularity.
fn default_latency_buckets() -> Vec<f64> {
    vec![
        0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
    ]
}

/// All metrics for the braid backend.
pub struct Metrics {
    /// Prometheus registry for all metrics.
    pub registry: Registry,

    /// Total number of documents ingested.
    pub documents_ingested_total: IntCounter,
    /// Total number of documents skipped as duplicates.
    pub documents_skipped_total: IntCounter,
    /// Total number of ingestion calls that failed outright.
    pub ingestion_errors_total: IntCounter,
    /// Total number of chunks written to at least one store.
    pub chunks_written_total: IntCounter,
    /// Total number of search queries executed.
    pub search_queries_total: IntCounter,

    /// Ingestion duration per document in seconds.
    pub ingest_duration_seconds: Histogram,
    /// Search query duration in seconds.
    pub search_duration_seconds: Histogram,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    /// Create a new metrics instance with all metrics registered.
    pub fn new() -> Self {
        let registry = Registry::new();

        let documents_ingested_total = IntCounter::new(
            "braid_documents_ingested_total",
            "Total number of documents ingested",
        )
        .expect("failed to create counter");

        let documents_skipped_total = IntCounter::new(
            "braid_documents_skipped_total",
            "Total number of documents skipped as duplicates",
        )
        .expect("failed to create counter");

        let ingestion_errors_total = IntCounter::new(
            "braid_ingestion_errors_total",
            "Total number of failed ingestion calls",
        )
        .expect("failed to create counter");

        let chunks_written_total = IntCounter::new(
            "braid_chunks_written_total",
            "Total number of chunks written to at least one store",
        )
        .expect("failed to create counter");

        let search_queries_total = IntCounter::new(
            "braid_search_queries_total",
            "Total number of search queries executed",
        )
        .expect("failed to create counter");

        let ingest_duration_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "braid_ingest_duration_seconds",
                "Document ingestion duration in seconds",
            )
            .buckets(default_latency_buckets()),
        )
        .expect("failed to create histogram");

        let search_duration_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "braid_search_duration_seconds",
                "Search query duration in seconds",
            )
            .buckets(default_latency_buckets()),
        )
        .expect("failed to create histogram");

        for collector in [
            Box::new(documents_ingested_total.clone()) as Box<dyn prometheus::core::Collector>,
            Box::new(documents_skipped_total.clone()),
            Box::new(ingestion_errors_total.clone()),
            Box::new(chunks_written_total.clone()),
            Box::new(search_queries_total.clone()),
            Box::new(ingest_duration_seconds.clone()),
            Box::new(search_duration_seconds.clone()),
        ] {
            registry
                .register(collector)
                .expect("failed to register metric");
        }

        Self {
            registry,
            documents_ingested_total,
            documents_skipped_total,
            ingestion_errors_total,
            chunks_written_total,
            search_queries_total,
            ingest_duration_seconds,
            search_duration_seconds,
        }
    }
}

/// [`ObservabilitySink`] backed by the global prometheus registry.
///
/// Recording never returns errors or panics; the ingestion and retrieval
/// paths are never blocked by observability.
#[derive(Debug, Default)]
pub struct PrometheusSink;

impl ObservabilitySink for PrometheusSink {
    fn record_ingestion(&self, status: IngestionStatus, chunk_count: usize, duration: Duration) {
        let metrics = get_metrics();
        match status {
            IngestionStatus::Completed => {
                metrics.documents_ingested_total.inc();
                metrics.chunks_written_total.inc_by(chunk_count as u64);
            }
            IngestionStatus::Skipped => {
                metrics.documents_skipped_total.inc();
            }
            IngestionStatus::Failed => {
                metrics.ingestion_errors_total.inc();
            }
        }
        metrics
            .ingest_duration_seconds
            .observe(duration.as_secs_f64());
    }

    fn record_retrieval(&self, _search_type: SearchType, _result_count: usize, duration: Duration) {
        let metrics = get_metrics();
        metrics.search_queries_total.inc();
        metrics
            .search_duration_seconds
            .observe(duration.as_secs_f64());
    }
}
