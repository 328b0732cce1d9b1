use log::{debug, warn};

use crate::{
    FeatureId, RegionId,
    graph::IndexGraph,
    loading::MapSource,
    model::{Restriction, RestrictionKind},
};

/// Counters of one restriction load
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RestrictionStats {
    pub loaded: usize,
    pub no: usize,
    pub only: usize,
    /// No chains produced from Only records
    pub converted: usize,
    pub skipped: usize,
}

/// Restriction table of one region, expressed as No chains only
#[derive(Debug, Clone, Default)]
pub struct RestrictionLoader {
    no_restrictions: Vec<Vec<FeatureId>>,
    stats: RestrictionStats,
}

impl RestrictionLoader {
    /// Reads the restrictions of `region`.
    ///
    /// An unreadable section is not fatal: the region then routes without
    /// restrictions.
    pub fn load(source: &dyn MapSource, region: RegionId, graph: &IndexGraph) -> Self {
        match source.restrictions(region) {
            Ok(records) => Self::from_records(records, graph),
            Err(e) => {
                warn!("Failed to read restrictions of region {region}, ignoring them: {e}");
                Self::default()
            }
        }
    }

    pub fn from_records(records: Vec<Restriction>, graph: &IndexGraph) -> Self {
        let mut stats = RestrictionStats {
            loaded: records.len(),
            ..RestrictionStats::default()
        };
        let mut no_restrictions = Vec::with_capacity(records.len());

        for record in records {
            if !record.is_valid() {
                warn!("Dropping malformed restriction {record} in region {}", graph.region());
                stats.skipped += 1;
                continue;
            }
            match record.kind {
                RestrictionKind::No => {
                    stats.no += 1;
                    no_restrictions.push(record.feature_ids);
                }
                RestrictionKind::Only => {
                    stats.only += 1;
                    match convert_only_to_no(&record.feature_ids, graph) {
                        Some(converted) => {
                            stats.converted += converted.len();
                            no_restrictions.extend(converted);
                        }
                        None => {
                            debug!("Only restriction {record} has no common joint, skipping");
                            stats.skipped += 1;
                        }
                    }
                }
            }
        }

        no_restrictions.sort_unstable();
        no_restrictions.dedup();
        Self {
            no_restrictions,
            stats,
        }
    }

    /// Sorted, duplicate-free No chains
    pub fn no_restrictions(&self) -> &[Vec<FeatureId>] {
        &self.no_restrictions
    }

    pub fn into_no_restrictions(self) -> Vec<Vec<FeatureId>> {
        self.no_restrictions
    }

    pub fn stats(&self) -> RestrictionStats {
        self.stats
    }
}

/// Rewrites an Only chain ending in `(P, L)` into the No chains `(.., P, X)` for
/// every feature `X` at the joint shared by `P` and `L`, except `L`.
///
/// `P` itself is among the `X`, so the U-turn back onto `P` is forbidden too.
/// Returns `None` when `P` and `L` share no end joint.
pub fn convert_only_to_no(chain: &[FeatureId], graph: &IndexGraph) -> Option<Vec<Vec<FeatureId>>> {
    let [.., prev, last] = chain else {
        return None;
    };
    let prev_last = graph.road(*prev).ok()?.last_point_id();
    let last_last = graph.road(*last).ok()?.last_point_id();
    let (_, _, joint) = graph
        .road_index()
        .adjacent_ft_points(*prev, prev_last, *last, last_last)?;

    let mut features: Vec<FeatureId> = graph
        .joint_index()
        .points(joint)
        .into_iter()
        .map(|rp| rp.feature_id())
        .filter(|&feature_id| feature_id != *last)
        .collect();
    features.sort_unstable();
    features.dedup();

    let head = &chain[..chain.len() - 1];
    Some(
        features
            .into_iter()
            .map(|other| {
                let mut no = head.to_vec();
                no.push(other);
                no
            })
            .collect(),
    )
}
