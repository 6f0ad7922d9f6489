//! Batched independent runs across a range of similarity thresholds.

use crate::{Result, SchellingConfig, SchellingError, Simulation};
use ordered_float::OrderedFloat;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Thresholds swept by the reference segregation experiment.
pub const DEFAULT_SWEEP_THRESHOLDS: [f64; 8] = [0.0, 0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7];

/// Terminal statistics of one run in a sweep.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct SweepPoint {
    pub threshold: f64,
    pub seed: u64,
    pub iterations: u32,
    pub converged: bool,
    pub total_relocations: u64,
    pub mean_similarity: f64,
}

/// Sweep outcome, ordered by threshold.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct SweepResult {
    pub points: Vec<SweepPoint>,
}

impl SweepResult {
    /// Threshold → mean similarity.
    #[must_use]
    pub fn by_threshold(&self) -> BTreeMap<OrderedFloat<f64>, f64> {
        self.points
            .iter()
            .map(|point| (OrderedFloat(point.threshold), point.mean_similarity))
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Run one simulation per threshold on copies of `base`.
///
/// Each run owns its own grid and RNG. Run `i` is seeded with
/// `base_seed.wrapping_add(i)`, so results do not depend on scheduling.
pub fn threshold_sweep(base: &SchellingConfig, thresholds: &[f64]) -> Result<SweepResult> {
    if thresholds.is_empty() {
        return Err(SchellingError::InvalidConfig(
            "threshold sweep needs at least one threshold",
        ));
    }
    base.validate()?;
    let base_seed = base.rng_seed.unwrap_or_else(rand::random);

    let mut points = thresholds
        .par_iter()
        .enumerate()
        .map(|(idx, &threshold)| -> Result<SweepPoint> {
            let seed = base_seed.wrapping_add(idx as u64);
            let config = SchellingConfig {
                similarity_threshold: threshold,
                rng_seed: Some(seed),
                ..base.clone()
            };
            let mut simulation = Simulation::new(config)?;
            let summary = simulation.run()?;
            debug!(threshold, seed, similarity = summary.mean_similarity, "sweep run done");
            Ok(SweepPoint {
                threshold,
                seed,
                iterations: summary.iterations,
                converged: summary.converged,
                total_relocations: summary.total_relocations,
                mean_similarity: summary.mean_similarity,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    points.sort_by_key(|point| OrderedFloat(point.threshold));
    Ok(SweepResult { points })
}
