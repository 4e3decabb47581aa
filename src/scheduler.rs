//! # Ingestion Scheduler
//!
//! Runs an ingestion pass immediately and then once per interval until the
//! shutdown token fires. A failed pass is logged and the loop carries on.
//! Shutdown is only observed between passes.

use std::sync::Arc;

use metrics::histogram;
use tokio::time::{Duration, Instant, sleep};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument};

use crate::config::SchedulerConfig;
use crate::ingestion::IngestionOrchestrator;

/// Background scheduler service.
pub struct IngestionScheduler {
    orchestrator: Arc<IngestionOrchestrator>,
    interval: Duration,
}

impl IngestionScheduler {
    pub fn new(orchestrator: Arc<IngestionOrchestrator>, config: &SchedulerConfig) -> Self {
        Self {
            orchestrator,
            interval: Duration::from_secs(config.interval_seconds),
        }
    }

    /// Override the pass interval (primarily for tests).
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Run the scheduler loop until the provided shutdown token fires.
    /// Returns the number of passes started.
    #[instrument(skip_all)]
    pub async fn run(self, shutdown: CancellationToken) -> u64 {
        info!(interval_secs = self.interval.as_secs(), "Starting ingestion scheduler");
        let mut passes = 0;

        loop {
            if shutdown.is_cancelled() {
                break;
            }

            passes += 1;
            self.tick(passes).await;

            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Ingestion scheduler shutdown requested");
                    break;
                }
                _ = sleep(self.interval) => {}
            }
        }

        info!(passes, "Ingestion scheduler stopped");
        passes
    }

    async fn tick(&self, pass: u64) {
        let tick_started = Instant::now();
        if let Err(err) = self.orchestrator.run_ingestion_pass().await {
            error!(pass, error = %err, "Scheduled ingestion pass failed");
        }
        histogram!("ingestion_scheduler_tick_duration_ms")
            .record(tick_started.elapsed().as_secs_f64() * 1_000.0);
    }
}
