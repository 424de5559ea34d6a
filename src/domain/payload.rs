//! Request bodies sent by the workers.
//!
//! Every request carries a JSON array of log-like records. Field values are
//! randomized per request so the target cannot serve repeated bodies from a
//! cache.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use strum::VariantArray;

use crate::config::PayloadConfig;
use crate::error::LoadError;

/// Severity of a generated record, chosen uniformly per record.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::VariantArray,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Level {
    Info,
    Error,
    Debug,
}

/// One record of the request body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    pub level: Level,
    pub message: String,
    pub user_id: u32,
    pub extra_data: String,
}

/// Immutable recipe for request bodies, shared by all workers.
#[derive(Debug, Clone)]
pub struct PayloadTemplate {
    message: String,
    records_per_request: usize,
    filler: String,
    user_ids: RangeInclusive<u32>,
}

impl PayloadTemplate {
    pub fn new(
        message: impl Into<String>,
        records_per_request: usize,
        filler_len: usize,
        user_ids: RangeInclusive<u32>,
    ) -> Self {
        Self {
            message: message.into(),
            records_per_request,
            filler: "x".repeat(filler_len),
            user_ids,
        }
    }

    pub fn from_config(cfg: &PayloadConfig) -> Self {
        Self::new(
            cfg.message.clone(),
            cfg.records_per_request,
            cfg.filler_len,
            cfg.user_id_min..=cfg.user_id_max,
        )
    }

    /// Generate a single randomized record
    pub fn record<R: Rng + ?Sized>(&self, rng: &mut R) -> LogRecord {
        let levels = Level::VARIANTS;
        LogRecord {
            level: levels[rng.gen_range(0..levels.len())],
            message: self.message.clone(),
            user_id: rng.gen_range(self.user_ids.clone()),
            extra_data: self.filler.clone(),
        }
    }

    pub fn batch<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<LogRecord> {
        (0..self.records_per_request)
            .map(|_| self.record(rng))
            .collect()
    }

    /// Serialize a fresh batch into a request body
    pub fn render<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Vec<u8>, LoadError> {
        Ok(serde_json::to_vec(&self.batch(rng))?)
    }
}

impl Default for PayloadTemplate {
    fn default() -> Self {
        Self::from_config(&PayloadConfig::default())
    }
}
