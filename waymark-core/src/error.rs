use serde::Serialize;
use thiserror::Error;

use crate::{FeatureId, JointId, RegionId};

#[derive(Error, Debug)]
pub enum Error {
    #[error("No road found near the start point")]
    StartPointNotFound,
    #[error("No road found near the finish point")]
    EndPointNotFound,
    #[error("Route not found")]
    RouteNotFound,
    #[error("Route calculation cancelled")]
    Cancelled,
    #[error("Unknown region {0}")]
    UnknownRegion(RegionId),
    #[error("Feature {feature} not found in region {region}")]
    FeatureNotFound { region: RegionId, feature: FeatureId },
    #[error("Segment {segment} is out of range for feature {feature} with {points} points")]
    SegmentOutOfRange {
        feature: FeatureId,
        segment: u32,
        points: usize,
    },
    #[error("Joint {0} not found")]
    JointNotFound(JointId),
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("GeoJSON error: {0}")]
    GeoJsonError(String),
    #[error("Invalid data: {0}")]
    InvalidData(String),
    #[error("Internal error: {0}")]
    InternalError(String),
}

pub type RouterError = Error;

/// Outcome of a route request as reported to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ResultCode {
    NoError,
    StartPointNotFound,
    EndPointNotFound,
    RouteNotFound,
    Cancelled,
    InternalError,
}

impl ResultCode {
    pub fn of<T>(result: &Result<T, Error>) -> Self {
        match result {
            Ok(_) => Self::NoError,
            Err(e) => Self::from(e),
        }
    }
}

impl From<&Error> for ResultCode {
    fn from(error: &Error) -> Self {
        match error {
            Error::StartPointNotFound => Self::StartPointNotFound,
            Error::EndPointNotFound => Self::EndPointNotFound,
            Error::RouteNotFound => Self::RouteNotFound,
            Error::Cancelled => Self::Cancelled,
            _ => Self::InternalError,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expected_outcomes_keep_their_codes() {
        assert_eq!(
            ResultCode::from(&Error::StartPointNotFound),
            ResultCode::StartPointNotFound
        );
        assert_eq!(
            ResultCode::from(&Error::EndPointNotFound),
            ResultCode::EndPointNotFound
        );
        assert_eq!(ResultCode::from(&Error::RouteNotFound), ResultCode::RouteNotFound);
        assert_eq!(ResultCode::from(&Error::Cancelled), ResultCode::Cancelled);
    }

    #[test]
    fn structural_failures_become_internal_errors() {
        let errors = [
            Error::JointNotFound(3),
            Error::UnknownRegion(1),
            Error::FeatureNotFound {
                region: 0,
                feature: 7,
            },
            Error::InvalidData("broken".into()),
        ];
        for error in &errors {
            assert_eq!(ResultCode::from(error), ResultCode::InternalError);
        }
    }

    #[test]
    fn ok_results_report_no_error() {
        let result: Result<u32, Error> = Ok(1);
        assert_eq!(ResultCode::of(&result), ResultCode::NoError);
    }
}
