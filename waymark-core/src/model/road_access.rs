use serde::{Deserialize, Serialize};

/// Access class of a feature or of a single barrier point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessType {
    No,
    Private,
    Destination,
    #[default]
    Yes,
}

impl AccessType {
    pub fn is_blocked(self) -> bool {
        self == Self::No
    }
}
