use rand::rngs::StdRng;
use rand::SeedableRng;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE, USER_AGENT};
use reqwest::Url;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace, warn};

use super::counters::{RunFlag, SharedCounters};
use crate::domain::{Outcome, PayloadTemplate, TransportFault};
use crate::error::LoadError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum WorkerState {
    Running,
    Reconnecting,
    Stopped,
}

/// Everything a worker shares with the coordinator and its siblings.
#[derive(Debug, Clone)]
pub struct WorkerContext {
    pub target: Url,
    pub headers: HeaderMap,
    pub request_timeout: Duration,
    pub payload: Arc<PayloadTemplate>,
    pub max_requests: Option<u64>,
    pub counters: Arc<SharedCounters>,
    pub running: Arc<RunFlag>,
}

impl WorkerContext {
    /// Default headers sent with every request
    pub fn default_headers(content_type: &str) -> Result<HeaderMap, LoadError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("ingest-stress/", env!("CARGO_PKG_VERSION"))),
        );
        let value = HeaderValue::from_str(content_type).map_err(|e| {
            LoadError::InvalidConfig(format!("content type '{content_type}': {e}"))
        })?;
        headers.insert(CONTENT_TYPE, value);
        Ok(headers)
    }
}

/// Per-worker totals handed back when the loop exits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerSummary {
    pub id: usize,
    pub attempts: u64,
    pub reconnects: u64,
}

/// One request loop over one keep-alive connection.
pub struct Worker {
    id: usize,
    ctx: WorkerContext,
    client: reqwest::Client,
    rng: StdRng,
    state: WorkerState,
    summary: WorkerSummary,
}

/// A client that holds at most one idle HTTP/1.1 connection. Dropping it
/// closes that connection. Redirects are not followed: a 3xx is a failure of
/// the POST itself.
fn connect(ctx: &WorkerContext) -> Result<reqwest::Client, LoadError> {
    reqwest::Client::builder()
        .http1_only()
        .redirect(reqwest::redirect::Policy::none())
        .pool_max_idle_per_host(1)
        .tcp_nodelay(true)
        .no_proxy()
        .timeout(ctx.request_timeout)
        .default_headers(ctx.headers.clone())
        .build()
        .map_err(LoadError::ClientBuild)
}

impl Worker {
    pub fn new(id: usize, ctx: WorkerContext) -> Result<Self, LoadError> {
        let client = connect(&ctx)?;
        Ok(Self {
            id,
            ctx,
            client,
            rng: StdRng::from_entropy(),
            state: WorkerState::Running,
            summary: WorkerSummary {
                id,
                ..WorkerSummary::default()
            },
        })
    }

    pub fn state(&self) -> WorkerState {
        self.state
    }

    fn transition(&mut self, next: WorkerState) {
        trace!(worker = self.id, from = %self.state, to = %next, "worker state change");
        self.state = next;
    }

    fn budget_left(&self) -> bool {
        self.ctx
            .max_requests
            .map_or(true, |max| self.summary.attempts < max)
    }

    /// Issue requests until the run flag drops or the attempt budget is spent.
    pub async fn run(mut self) -> Result<WorkerSummary, LoadError> {
        while self.ctx.running.is_running() && self.budget_left() {
            let outcome = self.attempt().await?;
            self.ctx.counters.record(&outcome);
            self.summary.attempts += 1;

            if let Outcome::TransportFault(fault) = &outcome {
                debug!(worker = self.id, kind = fault.kind(), error = %fault, "transport fault, reconnecting");
                self.reconnect();
            }
        }
        self.transition(WorkerState::Stopped);
        debug!(worker = self.id, attempts = self.summary.attempts, "worker stopped");
        Ok(self.summary)
    }

    /// Send one request and drain its response.
    ///
    /// Only payload serialization can fail here; everything on the wire is
    /// folded into the returned [`Outcome`].
    pub async fn attempt(&mut self) -> Result<Outcome, LoadError> {
        let body = self.ctx.payload.render(&mut self.rng)?;
        let response = match self
            .client
            .post(self.ctx.target.clone())
            .body(body)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => return Ok(TransportFault::from_reqwest(&e).into()),
        };

        let status = response.status();
        // An undrained body keeps the connection busy for the next request
        match response.bytes().await {
            Ok(_) => Ok(Outcome::from_status(status)),
            Err(e) => Ok(TransportFault::from_reqwest(&e).into()),
        }
    }

    /// Replace the client, dropping the stale connection with it.
    fn reconnect(&mut self) {
        self.transition(WorkerState::Reconnecting);
        match connect(&self.ctx) {
            Ok(client) => {
                self.client = client;
                self.summary.reconnects += 1;
                self.ctx.counters.record_reconnect();
            }
            Err(e) => warn!(worker = self.id, error = %e, "failed to rebuild client, keeping the old one"),
        }
        self.transition(WorkerState::Running);
    }
}
