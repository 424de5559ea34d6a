//! Load driver: spawns the workers, holds the measurement window, then stops
//! and joins them.

pub mod counters;
pub mod worker;

pub use counters::{Counts, RunFlag, SharedCounters};
pub use worker::{Worker, WorkerContext, WorkerState, WorkerSummary};

use chrono::Local;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tokio::task::{JoinError, JoinSet};
use tokio::time::{sleep, timeout};
use tracing::{error, info, warn};
use validator::Validate;

use crate::config::Config;
use crate::domain::PayloadTemplate;
use crate::error::LoadError;
use crate::report::{RunReport, Termination};

pub struct LoadDriver {
    config: Config,
    ctx: WorkerContext,
}

impl LoadDriver {
    pub fn new(config: Config) -> Result<Self, LoadError> {
        config.validate()?;
        let target = config.target.parse_url()?;
        let headers = WorkerContext::default_headers(&config.target.content_type)?;

        let ctx = WorkerContext {
            target,
            headers,
            request_timeout: config.load.request_timeout(),
            payload: Arc::new(PayloadTemplate::from_config(&config.payload)),
            max_requests: config.load.max_requests_per_worker,
            counters: Arc::new(SharedCounters::new()),
            running: Arc::new(RunFlag::new()),
        };
        Ok(Self { config, ctx })
    }

    /// Run for the configured duration.
    pub async fn run(self) -> Result<RunReport, LoadError> {
        self.run_until(std::future::pending()).await
    }

    /// Run for the configured duration, or until `stop` resolves.
    pub async fn run_until<F>(self, stop: F) -> Result<RunReport, LoadError>
    where
        F: Future<Output = ()>,
    {
        let load = &self.config.load;

        // Build every client before spawning so a setup error leaves nothing running
        let workers = (0..load.workers)
            .map(|id| Worker::new(id, self.ctx.clone()))
            .collect::<Result<Vec<_>, _>>()?;

        let started_at = Local::now();
        let start = Instant::now();
        let mut handles = JoinSet::new();
        for worker in workers {
            handles.spawn(worker.run());
        }
        info!(
            target_url = %self.ctx.target,
            workers = load.workers,
            duration_secs = load.duration_secs,
            "load test started"
        );

        let mut summaries = Vec::with_capacity(load.workers);
        let window = sleep(load.duration());
        tokio::pin!(window);
        tokio::pin!(stop);

        let termination = loop {
            tokio::select! {
                _ = &mut window => break Termination::Elapsed,
                _ = &mut stop => break Termination::Interrupted,
                joined = handles.join_next() => match joined {
                    Some(result) => record_join(result, &mut summaries),
                    None => break Termination::Exhausted,
                },
            }
        };
        let measured = start.elapsed();

        self.ctx.running.stop();
        info!(%termination, elapsed_ms = measured.as_millis() as u64, "stopping workers");

        let drained = timeout(load.grace_period(), drain(&mut handles, &mut summaries)).await;
        let stragglers = match drained {
            Ok(()) => 0,
            Err(_) => {
                let remaining = handles.len();
                warn!(remaining, grace_ms = load.grace_period_ms, "workers missed the grace period, aborting");
                handles.abort_all();
                while handles.join_next().await.is_some() {}
                remaining
            }
        };

        let window = match termination {
            Termination::Elapsed => load.duration(),
            Termination::Interrupted | Termination::Exhausted => measured,
        };

        let report = RunReport::new(
            &self.config,
            started_at,
            window,
            self.ctx.counters.snapshot(),
            termination,
            stragglers,
        );
        info!(
            joined = summaries.len(),
            stragglers,
            success = report.counts.success_count,
            failed = report.counts.fail_count,
            reconnects = report.counts.reconnects,
            rps = report.requests_per_second,
            "load test finished"
        );
        Ok(report)
    }
}

async fn drain(
    handles: &mut JoinSet<Result<WorkerSummary, LoadError>>,
    summaries: &mut Vec<WorkerSummary>,
) {
    while let Some(result) = handles.join_next().await {
        record_join(result, summaries);
    }
}

fn record_join(
    result: Result<Result<WorkerSummary, LoadError>, JoinError>,
    summaries: &mut Vec<WorkerSummary>,
) {
    match result {
        Ok(Ok(summary)) => summaries.push(summary),
        Ok(Err(e)) => error!(error = %e, "worker failed"),
        Err(e) if e.is_cancelled() => {}
        Err(e) => error!(error = %e, "worker panicked"),
    }
}
