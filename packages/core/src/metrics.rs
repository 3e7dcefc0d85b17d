//! Prometheus metrics registry for the fee tracker.
//!
//! [`AppMetrics`] owns all registered metrics and the [`Registry`] they
//! belong to. Construct it once at startup, wrap in `Arc`, and pass it
//! to the scheduler and the API state.
//!
//! Exposed at `GET /metrics` in Prometheus text exposition format
//! (`text/plain; version=0.0.4`).

use prometheus::{
    Counter, CounterVec, Gauge, GaugeVec, Histogram, HistogramOpts, Opts, Registry,
};

use crate::fetch_meta::FetchMeta;
use crate::types::Snapshot;

/// All application-level Prometheus metrics.
pub struct AppMetrics {
    /// Snapshots built, including empty fallback snapshots.
    pub snapshots_total: Counter,
    /// Snapshot runs that failed as a whole and published an empty snapshot.
    pub snapshot_failures_total: Counter,
    /// Wall-clock time to build one snapshot, in seconds.
    pub snapshot_duration: Histogram,
    /// Per-chain outcomes, labelled by chain key and status.
    pub chain_status_total: CounterVec,
    /// Latest published USD fee per chain.
    pub chain_fee_usd: GaugeVec,
    /// Providers whose most recent call failed.
    pub failing_providers: Gauge,
    /// The registry that owns all of the above metrics.
    pub registry: Registry,
}

impl AppMetrics {
    /// Create and register all metrics. Returns an error if any metric
    /// name is invalid or duplicated.
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let snapshots_total = Counter::with_opts(Opts::new(
            "fee_tracker_snapshots_total",
            "Total snapshots generated",
        ))?;

        let snapshot_failures_total = Counter::with_opts(Opts::new(
            "fee_tracker_snapshot_failures_total",
            "Snapshot runs that fell back to an empty snapshot",
        ))?;

        let snapshot_duration = Histogram::with_opts(
            HistogramOpts::new(
                "fee_tracker_snapshot_duration_seconds",
                "Snapshot build time in seconds",
            )
            .buckets(vec![0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 15.0, 25.0, 40.0]),
        )?;

        let chain_status_total = CounterVec::new(
            Opts::new(
                "fee_tracker_chain_status_total",
                "Per-chain snapshot outcomes by status",
            ),
            &["chain", "status"],
        )?;

        let chain_fee_usd = GaugeVec::new(
            Opts::new("fee_tracker_chain_fee_usd", "Latest published fee in USD"),
            &["chain"],
        )?;

        let failing_providers = Gauge::with_opts(Opts::new(
            "fee_tracker_failing_providers",
            "Tracked providers whose last call failed",
        ))?;

        registry.register(Box::new(snapshots_total.clone()))?;
        registry.register(Box::new(snapshot_failures_total.clone()))?;
        registry.register(Box::new(snapshot_duration.clone()))?;
        registry.register(Box::new(chain_status_total.clone()))?;
        registry.register(Box::new(chain_fee_usd.clone()))?;
        registry.register(Box::new(failing_providers.clone()))?;

        Ok(Self {
            snapshots_total,
            snapshot_failures_total,
            snapshot_duration,
            chain_status_total,
            chain_fee_usd,
            failing_providers,
            registry,
        })
    }

    /// Fold one finished snapshot into the metrics.
    pub fn record_snapshot(&self, snapshot: &Snapshot, elapsed_secs: f64, fetch_meta: &FetchMeta) {
        self.snapshots_total.inc();
        self.snapshot_duration.observe(elapsed_secs);
        if snapshot.chains.is_empty() {
            self.snapshot_failures_total.inc();
        }

        for (key, fee) in &snapshot.chains {
            self.chain_status_total
                .with_label_values(&[key.as_str(), fee.status.as_str()])
                .inc();
            match fee.fee_usd {
                Some(usd) => self.chain_fee_usd.with_label_values(&[key.as_str()]).set(usd),
                None => {
                    let _ = self.chain_fee_usd.remove_label_values(&[key.as_str()]);
                }
            }
        }

        self.failing_providers.set(fetch_meta.failing_providers() as f64);
    }

    /// Render all metrics as Prometheus text format (for the `/metrics` endpoint).
    pub fn render(&self) -> Result<String, prometheus::Error> {
        use prometheus::Encoder;
        let encoder = prometheus::TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buf = Vec::new();
        encoder.encode(&metric_families, &mut buf)?;
        Ok(String::from_utf8(buf).unwrap_or_default())
    }
}
