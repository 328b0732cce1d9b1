use std::fmt;

use serde::{Deserialize, Serialize};

use crate::FeatureId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RestrictionKind {
    No,
    Only,
}

/// Turn restriction over a chain of features.
///
/// `No` forbids continuing from the chain onto its last feature; `Only` allows
/// nothing but that continuation.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Restriction {
    pub kind: RestrictionKind,
    pub feature_ids: Vec<FeatureId>,
}

impl Restriction {
    pub fn new(kind: RestrictionKind, feature_ids: Vec<FeatureId>) -> Self {
        Self { kind, feature_ids }
    }

    pub fn no(feature_ids: Vec<FeatureId>) -> Self {
        Self::new(RestrictionKind::No, feature_ids)
    }

    pub fn only(feature_ids: Vec<FeatureId>) -> Self {
        Self::new(RestrictionKind::Only, feature_ids)
    }

    /// At least two features and no feature repeated back to back
    pub fn is_valid(&self) -> bool {
        self.feature_ids.len() >= 2 && self.feature_ids.windows(2).all(|w| w[0] != w[1])
    }
}

impl fmt::Display for Restriction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}{:?}", self.kind, self.feature_ids)
    }
}
