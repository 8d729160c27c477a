//! Weighted, renormalised score aggregation.
//!
//! One rule serves every probe family: within a category each probe that
//! ran contributes `metric × weight / Σ(weights of probes that ran)`, and the
//! overall score combines category scores with their weights renormalised
//! over the categories present. Metrics are expected in `0..=100` already;
//! a non-finite metric counts as missing.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use tracing::warn;

use crate::domain::{CompositeScore, ProbeDescriptor, ProbeResult};
use crate::error::{OrchestraError, Result};
use crate::obs;

/// Weight applied to a category with no explicit entry.
pub const DEFAULT_CATEGORY_WEIGHT: f64 = 1.0;

/// Maps probe results to a [`CompositeScore`].
#[derive(Debug, Clone, Default)]
pub struct ScoreAggregator {
    category_weights: BTreeMap<String, f64>,
}

impl ScoreAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_category_weight(mut self, category: impl Into<String>, weight: f64) -> Self {
        self.category_weights.insert(category.into(), weight);
        self
    }

    pub fn with_category_weights(mut self, weights: BTreeMap<String, f64>) -> Self {
        self.category_weights.extend(weights);
        self
    }

    pub fn category_weight(&self, category: &str) -> f64 {
        self.category_weights
            .get(category)
            .copied()
            .unwrap_or(DEFAULT_CATEGORY_WEIGHT)
    }

    pub fn category_weights(&self) -> &BTreeMap<String, f64> {
        &self.category_weights
    }

    /// Check that every weighted or floored category has a registered probe.
    ///
    /// A category named here with no probe behind it is a wiring bug.
    pub fn check_categories(
        &self,
        registered: &[ProbeDescriptor],
        category_minimums: &BTreeMap<String, f64>,
    ) -> Result<()> {
        let known: BTreeSet<&str> = registered.iter().map(|d| d.category.as_str()).collect();
        let unknown = |source: &str, category: &str| {
            OrchestraError::aggregation(format!(
                "{source} configured for category '{category}' but no registered probe belongs to it"
            ))
        };

        for (category, weight) in &self.category_weights {
            if !known.contains(category.as_str()) {
                return Err(unknown("weight", category));
            }
            if !weight.is_finite() || *weight < 0.0 {
                return Err(OrchestraError::aggregation(format!(
                    "category '{category}' has invalid weight {weight}"
                )));
            }
        }
        for category in category_minimums.keys() {
            if !known.contains(category.as_str()) {
                return Err(unknown("minimum", category));
            }
        }

        for descriptor in registered {
            if !descriptor.weight.is_finite() || descriptor.weight < 0.0 {
                return Err(OrchestraError::aggregation(format!(
                    "probe '{}' has invalid weight {}",
                    descriptor.name, descriptor.weight
                )));
            }
        }
        Ok(())
    }

    /// Combine `results` (probes that ran) using the weights in `descriptors`.
    ///
    /// Pure: the same inputs always produce the same score.
    pub fn aggregate(
        &self,
        descriptors: &[ProbeDescriptor],
        results: &[ProbeResult],
    ) -> Result<CompositeScore> {
        let by_name: HashMap<&str, &ProbeDescriptor> =
            descriptors.iter().map(|d| (d.name.as_str(), d)).collect();

        let mut groups: BTreeMap<&str, Vec<(&ProbeDescriptor, &ProbeResult)>> = BTreeMap::new();
        for result in results {
            let descriptor = by_name.get(result.probe_name.as_str()).ok_or_else(|| {
                OrchestraError::aggregation(format!(
                    "result for unregistered probe '{}'",
                    result.probe_name
                ))
            })?;
            groups
                .entry(descriptor.category.as_str())
                .or_default()
                .push((descriptor, result));
        }

        let mut per_category = BTreeMap::new();
        let mut flagged_categories = BTreeSet::new();

        for (category, members) in &groups {
            let weights = normalized(members.iter().map(|(d, _)| d.weight));
            let mut score = 0.0;
            let mut reported = 0usize;

            for ((descriptor, result), weight) in members.iter().zip(weights) {
                match result.metric(&descriptor.score_metric) {
                    Some(value) if value.is_finite() => {
                        score += value * weight;
                        reported += 1;
                    }
                    Some(value) => {
                        warn!(
                            probe = %descriptor.name,
                            metric = %descriptor.score_metric,
                            %value,
                            "probe reported a non-finite score; counting it as 0"
                        );
                    }
                    None => {
                        if result.success {
                            warn!(
                                probe = %descriptor.name,
                                metric = %descriptor.score_metric,
                                "probe succeeded without its score metric; counting it as 0"
                            );
                        }
                    }
                }
            }

            if reported == 0 {
                flagged_categories.insert(category.to_string());
            }
            per_category.insert(category.to_string(), score.clamp(0.0, 100.0));
        }

        let category_weights =
            normalized(per_category.keys().map(|c| self.category_weight(c)));
        let overall = per_category
            .values()
            .zip(category_weights)
            .map(|(score, weight)| score * weight)
            .sum::<f64>()
            .clamp(0.0, 100.0);

        obs::emit_score_aggregated(overall, per_category.len(), flagged_categories.len());

        Ok(CompositeScore {
            per_category,
            flagged_categories,
            overall,
        })
    }
}

/// Scale `weights` to sum to 1. All-zero input falls back to equal shares.
fn normalized(weights: impl Iterator<Item = f64>) -> Vec<f64> {
    let weights: Vec<f64> = weights.collect();
    let total: f64 = weights.iter().sum();
    if total > 0.0 {
        weights.iter().map(|w| w / total).collect()
    } else {
        let share = 1.0 / weights.len().max(1) as f64;
        vec![share; weights.len()]
    }
}
