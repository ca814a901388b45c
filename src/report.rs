use std::cmp::Ordering;

use serde::Serialize;

use crate::error::MetricError;
use crate::metrics::edit_distance::PairScore;
use crate::metrics::error_rate::ErrorRateResult;
use crate::metrics::state::AccumulatorState;
use crate::pipeline::traits::TokenCodec;
use crate::types::{ErrorUnit, Hypothesis};

pub const SCHEMA_VERSION: u32 = 1;
const OUTLIER_TOP_N: usize = 20;

#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub schema_version: u32,
    pub meta: Meta,
    pub utterances: Vec<UtteranceReport>,
    pub aggregates: AggregateReport,
}

#[derive(Debug, Clone, Serialize)]
pub struct Meta {
    pub generated_at: String,
    pub vocab_path: String,
    pub codec: String,
    pub unit: ErrorUnit,
    pub fold_consecutive: bool,
    pub case_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct UtteranceReport {
    pub id: String,
    pub reference: String,
    pub hypothesis: String,
    pub hypothesis_tokens: Vec<String>,
    pub distance: usize,
    pub reference_units: usize,
    /// `None` when the reference is empty.
    pub rate: Option<f64>,
    pub notes: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AggregateReport {
    pub counts: AggregateCounts,
    /// Rate over summed totals (not the mean of per-utterance rates).
    pub global: ErrorRateResult,
    pub rate_distribution: Option<MetricDistribution>,
    pub outliers: Vec<OutlierEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AggregateCounts {
    pub total: u32,
    pub exact_match: u32,
    pub empty_reference: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricDistribution {
    pub mean: f64,
    pub p50: f64,
    pub p90: f64,
    pub max: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct OutlierEntry {
    pub id: String,
    pub distance: usize,
    pub rate: Option<f64>,
}

pub fn compute_utterance_report(
    id: &str,
    reference: &str,
    hypothesis: &Hypothesis,
    score: PairScore,
    codec: &dyn TokenCodec,
) -> Result<UtteranceReport, MetricError> {
    let mut notes = Vec::new();
    if reference.trim().is_empty() {
        notes.push("empty_reference".to_string());
    }
    if hypothesis.text.trim().is_empty() {
        notes.push("empty_hypothesis".to_string());
    }

    let rate =
        (score.reference_units > 0).then(|| score.distance as f64 / score.reference_units as f64);

    Ok(UtteranceReport {
        id: id.to_string(),
        reference: reference.to_string(),
        hypothesis: hypothesis.text.clone(),
        hypothesis_tokens: codec.ids_to_tokens(&hypothesis.token_ids)?,
        distance: score.distance,
        reference_units: score.reference_units,
        rate,
        notes,
    })
}

pub fn aggregate_reports(utterances: &[UtteranceReport]) -> AggregateReport {
    let total: AccumulatorState = utterances
        .iter()
        .map(|u| AccumulatorState::new(u.distance as u64, u.reference_units as u64))
        .sum();
    let rates: Vec<f64> = utterances.iter().filter_map(|u| u.rate).collect();

    AggregateReport {
        counts: AggregateCounts {
            total: to_u32(utterances.len()),
            exact_match: to_u32(utterances.iter().filter(|u| u.distance == 0).count()),
            empty_reference: to_u32(utterances.iter().filter(|u| u.reference_units == 0).count()),
        },
        global: ErrorRateResult::from(total),
        rate_distribution: distribution_or_none(&rates),
        outliers: ranked_outliers(utterances, OUTLIER_TOP_N),
    }
}

fn ranked_outliers(utterances: &[UtteranceReport], top_n: usize) -> Vec<OutlierEntry> {
    let mut entries: Vec<OutlierEntry> = utterances
        .iter()
        .filter(|u| u.distance > 0)
        .map(|u| OutlierEntry {
            id: u.id.clone(),
            distance: u.distance,
            rate: u.rate,
        })
        .collect();

    entries.sort_by(|a, b| {
        b.distance
            .cmp(&a.distance)
            .then_with(|| {
                b.rate
                    .partial_cmp(&a.rate)
                    .unwrap_or(Ordering::Equal)
            })
            .then_with(|| a.id.cmp(&b.id))
    });
    entries.truncate(top_n);
    entries
}

fn distribution_or_none(values: &[f64]) -> Option<MetricDistribution> {
    if values.is_empty() {
        return None;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    Some(MetricDistribution {
        mean: sorted.iter().sum::<f64>() / sorted.len() as f64,
        p50: percentile_sorted(&sorted, 0.5),
        p90: percentile_sorted(&sorted, 0.9),
        max: sorted[sorted.len() - 1],
    })
}

fn percentile_sorted(sorted_values: &[f64], percentile: f64) -> f64 {
    let rank = percentile.clamp(0.0, 1.0) * (sorted_values.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let weight = rank - lower as f64;
    sorted_values[lower] + (sorted_values[upper] - sorted_values[lower]) * weight
}

fn to_u32(value: usize) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}
