//! Percentile pruning of similarity edges.

use tracing::{debug, info};

use crate::quantile::QuantileEstimator;
use crate::{Error, Result};
use super::DualGraph;

/// Outcome of one [`DualGraph::percentile_prune`] call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PruneReport {
    /// Estimated weight threshold; `None` when nothing was eligible.
    pub threshold: Option<f64>,
    /// Non-anchor edges fed to the estimator.
    pub considered: usize,
    /// Edges removed (weight strictly below the threshold).
    pub removed: usize,
}

impl DualGraph {
    /// Drop every non-anchor edge whose weight is strictly below the
    /// estimated `percentile`-th quantile of non-anchor edge weights.
    ///
    /// `percentile` is in `[0, 100]`. Anchor (`ANCHOR_OCCURS_IN`) edges are
    /// neither counted nor removed. With no eligible edges this is a no-op.
    pub fn percentile_prune(&mut self, percentile: f64) -> Result<PruneReport> {
        if !(0.0..=100.0).contains(&percentile) {
            return Err(Error::InvalidPercentile(percentile));
        }

        let mut estimator = QuantileEstimator::new();
        for edge in self.edge_records().iter().filter(|e| !e.edge_type.is_structural()) {
            estimator.update(edge.weight);
        }
        let considered = estimator.count() as usize;
        if considered == 0 {
            debug!("percentile prune skipped: no eligible edges");
            return Ok(PruneReport { threshold: None, considered: 0, removed: 0 });
        }

        let threshold = estimator.quantile(percentile / 100.0)?;
        let removed = self.retain_edges(|e| e.edge_type.is_structural() || e.weight >= threshold);
        info!(percentile, threshold, considered, removed, remaining = self.edge_count(), "pruned edges");
        Ok(PruneReport { threshold: Some(threshold), considered, removed })
    }
}
