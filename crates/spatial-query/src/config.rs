//! Query configuration: tolerances and hit-suppression policy.

use geom_types::Tolerance;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::failure::{Failure, QueryResult};

/// How duplicate intersection hits are collapsed after the narrow phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HitSuppression {
    /// Keep the first hit of every tolerance cluster, in emission order.
    #[default]
    FirstPerCluster,
    /// Keep every hit whose point exactly equals a surviving cluster
    /// representative. Several hits sharing one exact point all survive.
    ExactMembership,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    pub tolerance: Tolerance,
    pub hit_suppression: HitSuppression,
}

impl QueryConfig {
    pub fn with_tolerance(absolute: f64) -> Self {
        Self {
            tolerance: Tolerance::absolute(absolute),
            ..Self::default()
        }
    }

    /// Hit suppression matching the legacy membership filter.
    pub fn compatible(absolute: f64) -> Self {
        Self {
            tolerance: Tolerance::absolute(absolute),
            hit_suppression: HitSuppression::ExactMembership,
        }
    }

    /// Parse and validate a JSON configuration. Missing fields take defaults.
    pub fn from_json(text: &str) -> QueryResult<Self> {
        let config: Self = serde_json::from_str(text).map_err(|e| {
            Failure::invalid_argument(format!("invalid query configuration: {e}"))
                .with_metadata(json!({ "line": e.line(), "column": e.column() }))
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> QueryResult<()> {
        check_tolerance(self.tolerance.absolute)?;
        check_tolerance(self.tolerance.angular)?;
        Ok(())
    }

    /// The validated tolerance for one operation.
    pub fn resolve(&self) -> QueryResult<Tolerance> {
        self.validate()?;
        Ok(self.tolerance)
    }
}

/// Reject negative, NaN and infinite tolerances.
pub fn check_tolerance(value: f64) -> QueryResult<f64> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(Failure::invalid_tolerance(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::failure::FailureCode;

    #[test]
    fn test_default_config() {
        let config = QueryConfig::default();
        assert_eq!(config.hit_suppression, HitSuppression::FirstPerCluster);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_check_tolerance() {
        assert_eq!(check_tolerance(0.0), Ok(0.0));
        assert_eq!(check_tolerance(1e-3), Ok(1e-3));
        for bad in [-1e-9, f64::NAN, f64::INFINITY] {
            assert_eq!(
                check_tolerance(bad).unwrap_err().code,
                FailureCode::InvalidTolerance
            );
        }
    }

    #[test]
    fn test_from_json_partial() {
        let config =
            QueryConfig::from_json(r#"{"hit_suppression": "exact_membership"}"#).unwrap();
        assert_eq!(config.hit_suppression, HitSuppression::ExactMembership);
        assert_eq!(config.tolerance, Tolerance::default());

        let config = QueryConfig::from_json(r#"{"tolerance": {"absolute": 0.01}}"#).unwrap();
        assert!((config.tolerance.absolute - 0.01).abs() < 1e-15);
    }

    #[test]
    fn test_from_json_rejects_bad_input() {
        let err = QueryConfig::from_json("{not json").unwrap_err();
        assert_eq!(err.code, FailureCode::InvalidArgument);

        let err = QueryConfig::from_json(r#"{"tolerance": {"absolute": -1.0}}"#).unwrap_err();
        assert_eq!(err.code, FailureCode::InvalidTolerance);
    }

    #[test]
    fn test_compatible_preset() {
        let config = QueryConfig::compatible(1e-4);
        assert_eq!(config.hit_suppression, HitSuppression::ExactMembership);
        assert_eq!(config.resolve().unwrap().absolute, 1e-4);
    }
}
