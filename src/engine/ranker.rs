//! Opportunity ranker.
//!
//! Maintains an insertion-ordered sequence of scored opportunities capped
//! at the top 10 by priority. Insert is append → sort → truncate; at this
//! bound a dedicated index structure would be overkill.

use tracing::trace;

use crate::types::Opportunity;

/// Maximum number of opportunities retained.
pub const MAX_RANKED: usize = 10;

#[derive(Debug, Default)]
pub struct OpportunityRanker {
    entries: Vec<Opportunity>,
}

impl OpportunityRanker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an opportunity, replacing any existing entry for the same
    /// (symbol, venue) pair, then re-sort by priority descending and
    /// truncate to the cap. The sort is stable, so equal priorities keep
    /// insertion order, which is also the deploy-decision tie-break.
    pub fn insert(&mut self, opportunity: Opportunity) {
        self.entries
            .retain(|o| !(o.symbol == opportunity.symbol && o.venue == opportunity.venue));
        self.entries.push(opportunity);
        self.entries
            .sort_by(|a, b| b.priority.partial_cmp(&a.priority).unwrap_or(std::cmp::Ordering::Equal));
        self.entries.truncate(MAX_RANKED);
        trace!(count = self.entries.len(), "ranker updated");
    }

    /// Highest-priority opportunity that clears the confidence floor.
    pub fn top_qualifying(&self, min_confidence: f64) -> Option<&Opportunity> {
        self.entries.iter().find(|o| o.qualifies(min_confidence))
    }

    /// All ranked opportunities, best first.
    pub fn ranked(&self) -> &[Opportunity] {
        &self.entries
    }

    /// Empty the ranker. Called after a successful deploy consumes the top
    /// candidate, forcing a fresh scan before the next decision.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
