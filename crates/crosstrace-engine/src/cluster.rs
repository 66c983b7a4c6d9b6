//! Temporal clusterer: seed-anchored windowed grouping of one identity's
//! activities.
//!
//! Each activity is placed into the first existing cluster whose seed
//! (first) member's timestamp lies within the window — not the most
//! recently added member and not a centroid. A cluster's span can exceed
//! the window when later members are each within the window of the seed
//! but not of each other. That is a deliberate property of the policy;
//! downstream consumers depend on it.

use chrono::Duration;
use tracing::debug;

use crate::types::{ActivityRecord, TemporalCluster};

/// Groups timestamped activities into seed-anchored clusters.
#[derive(Clone, Copy, Debug)]
pub struct TemporalClusterer {
    window: Duration,
}

impl TemporalClusterer {
    /// Create a clusterer with the given window in minutes.
    pub fn new(window_minutes: i64) -> Self {
        Self {
            window: Duration::minutes(window_minutes),
        }
    }

    /// The configured window.
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Cluster one identity's activities.
    ///
    /// Activities without a timestamp are excluded. The rest are sorted
    /// ascending (ties keep their incoming order) and assigned greedily:
    /// first cluster whose seed timestamp is within the window wins,
    /// otherwise a new cluster opens with the activity as its seed.
    pub fn cluster(&self, activities: &[ActivityRecord]) -> Vec<TemporalCluster> {
        let mut timestamped: Vec<&ActivityRecord> =
            activities.iter().filter(|a| a.timestamp.is_some()).collect();
        if timestamped.is_empty() {
            return Vec::new();
        }
        timestamped.sort_by_key(|a| a.timestamp);

        let mut clusters: Vec<TemporalCluster> = Vec::new();
        for activity in timestamped {
            let Some(ts) = activity.timestamp else {
                continue;
            };
            let slot = clusters.iter().position(|cluster| {
                cluster
                    .seed_timestamp()
                    .is_some_and(|seed| (ts - seed).abs() <= self.window)
            });
            match slot {
                Some(index) => clusters[index].members.push(activity.clone()),
                None => clusters.push(TemporalCluster {
                    members: vec![activity.clone()],
                }),
            }
        }

        debug!(
            activities = activities.len(),
            clusters = clusters.len(),
            "temporal clustering complete"
        );
        clusters
    }
}

impl Default for TemporalClusterer {
    fn default() -> Self {
        Self::new(30)
    }
}
