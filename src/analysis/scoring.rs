//! Composite fund scoring.
//!
//! Each record gets weighted sub-scores normalised to the population
//! maximum of the same call:
//!
//! - return:  `3y / max(3y) × 40`
//! - risk:    `risk_adjusted / max(risk_adjusted) × 30`
//! - fee:     `(1 − fee / max(fee)) × 20` (cheaper is better)
//! - scale:   `ln(1 + scale) / ln(1 + max(scale)) × 10`, only when the
//!   source carries a scale column
//!
//! Scores therefore only compare within one scraping session.

use tracing::{debug, info};

use crate::config::ScoringSection;
use crate::types::{FundRecord, Horizon, ScoredRecord, SubScores};

/// Added to volatility before dividing.
const VOLATILITY_STABILIZER: f64 = 0.01;
/// Added to the fee rate before dividing.
const FEE_STABILIZER: f64 = 1.0;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Sub-score caps. Fixed rubric: return 40, risk 30, fee 20, scale 10.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoringWeights {
    pub return_weight: f64,
    pub risk_weight: f64,
    pub fee_weight: f64,
    pub scale_weight: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            return_weight: 40.0,
            risk_weight: 30.0,
            fee_weight: 20.0,
            scale_weight: 10.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoringConfig {
    pub weights: ScoringWeights,
    /// Shortlist length.
    pub top_n: usize,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            weights: ScoringWeights::default(),
            top_n: 10,
        }
    }
}

impl From<&ScoringSection> for ScoringConfig {
    fn from(section: &ScoringSection) -> Self {
        Self {
            top_n: section.top_n,
            ..Self::default()
        }
    }
}

// ---------------------------------------------------------------------------
// Risk proxy
// ---------------------------------------------------------------------------

/// Denominator used for the risk-adjusted return, chosen once per call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RiskProxy {
    /// Sample standard deviation across these return horizons.
    Volatility(Vec<Horizon>),
    /// Fee rate.
    Fee,
}

impl RiskProxy {
    /// Volatility when at least two volatility horizons carry numbers,
    /// fee otherwise.
    pub fn select(records: &[FundRecord]) -> Self {
        let available: Vec<Horizon> = Horizon::VOLATILITY
            .iter()
            .copied()
            .filter(|h| records.iter().any(|r| r.horizon(*h).is_some()))
            .collect();
        if available.len() >= 2 {
            RiskProxy::Volatility(available)
        } else {
            RiskProxy::Fee
        }
    }
}

/// Sample standard deviation (n − 1). `None` below two values.
pub fn sample_std_dev(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    Some(var.sqrt())
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

pub struct ScoringEngine {
    config: ScoringConfig,
}

impl ScoringEngine {
    pub fn new(config: ScoringConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    /// Score, rank descending and keep the top `top_n`.
    ///
    /// The sort is stable: equal scores keep input order.
    pub fn score(&self, records: &[FundRecord]) -> Vec<ScoredRecord> {
        let mut scored = self.score_all(records);
        scored.sort_by(|a, b| {
            b.composite
                .partial_cmp(&a.composite)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(self.config.top_n);

        if let Some(best) = scored.first() {
            info!(
                eligible = records.len(),
                kept = scored.len(),
                best = %best,
                "Scoring complete"
            );
        }
        scored
    }

    /// Score every record, in input order.
    pub fn score_all(&self, records: &[FundRecord]) -> Vec<ScoredRecord> {
        if records.is_empty() {
            return Vec::new();
        }
        let w = &self.config.weights;
        let proxy = RiskProxy::select(records);
        debug!(proxy = ?proxy, records = records.len(), "Risk proxy selected");

        let derived: Vec<(Option<f64>, Option<f64>)> = records
            .iter()
            .map(|r| risk_adjust(r, &proxy))
            .collect();

        let max_return = max_of(records.iter().map(|r| Some(r.return_3y)));
        let max_risk = max_of(derived.iter().map(|(_, ra)| *ra));
        let max_fee = max_of(records.iter().map(|r| r.fee));
        let max_scale = max_of(records.iter().map(|r| r.scale));

        records
            .iter()
            .zip(derived)
            .map(|(record, (volatility, risk_adjusted))| {
                let scores = SubScores {
                    return_score: ratio(record.return_3y, max_return).map(|x| x * w.return_weight),
                    risk_score: risk_adjusted
                        .and_then(|ra| ratio(ra, max_risk))
                        .map(|x| x * w.risk_weight),
                    fee_score: record
                        .fee
                        .and_then(|fee| ratio(fee, max_fee))
                        .map(|x| (1.0 - x) * w.fee_weight),
                    scale_score: record
                        .scale
                        .and_then(|s| log_ratio(s, max_scale))
                        .map(|x| x * w.scale_weight),
                };
                ScoredRecord {
                    record: record.clone(),
                    volatility,
                    risk_adjusted,
                    composite: scores.total(),
                    scores,
                }
            })
            .collect()
    }
}

/// `(volatility, risk_adjusted)` for one record.
fn risk_adjust(record: &FundRecord, proxy: &RiskProxy) -> (Option<f64>, Option<f64>) {
    match proxy {
        RiskProxy::Volatility(horizons) => {
            let values: Vec<f64> = horizons.iter().filter_map(|h| record.horizon(*h)).collect();
            let volatility = sample_std_dev(&values);
            let adjusted = volatility.map(|v| record.return_3y / (v + VOLATILITY_STABILIZER));
            (volatility, adjusted)
        }
        RiskProxy::Fee => (
            None,
            record.fee.map(|fee| record.return_3y / (fee + FEE_STABILIZER)),
        ),
    }
}

fn max_of(values: impl Iterator<Item = Option<f64>>) -> Option<f64> {
    values
        .flatten()
        .filter(|v| v.is_finite())
        .fold(None, |acc, v| Some(acc.map_or(v, |m: f64| m.max(v))))
}

/// `value / max`, undefined unless the maximum is positive.
fn ratio(value: f64, max: Option<f64>) -> Option<f64> {
    max.filter(|m| *m > 0.0)
        .map(|m| value / m)
        .filter(|r| r.is_finite())
}

fn log_ratio(value: f64, max: Option<f64>) -> Option<f64> {
    if value < 0.0 {
        return None;
    }
    let max = max.filter(|m| *m > 0.0)?;
    Some(value.ln_1p() / max.ln_1p())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
