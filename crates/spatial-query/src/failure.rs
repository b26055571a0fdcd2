//! Uniform failure value returned by every public operation.

use std::any::Any;
use std::fmt;

use geom_oracle::OracleError;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Stable failure codes. The string form (`as_str`) is part of the contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FailureCode {
    /// A required collection was empty.
    EmptyInput,
    /// Negative or non-finite tolerance.
    InvalidTolerance,
    /// `k` is zero or exceeds the search population.
    InvalidK,
    /// A low-level index argument was out of range.
    InvalidArgument,
    /// A primitive failed validity checks; metadata names its index.
    GeometryInvalid,
    /// The geometry kernel returned an error or panicked.
    OracleFault,
}

impl FailureCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureCode::EmptyInput => "EmptyInput",
            FailureCode::InvalidTolerance => "InvalidTolerance",
            FailureCode::InvalidK => "InvalidK",
            FailureCode::InvalidArgument => "InvalidArgument",
            FailureCode::GeometryInvalid => "GeometryInvalid",
            FailureCode::OracleFault => "OracleFault",
        }
    }
}

impl fmt::Display for FailureCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A typed failure: code, message, optional structured metadata.
#[derive(Debug, Clone, PartialEq, Serialize, thiserror::Error)]
#[error("{code}: {message}")]
pub struct Failure {
    pub code: FailureCode,
    pub message: String,
    pub metadata: Option<Value>,
}

pub type QueryResult<T> = Result<T, Failure>;

impl Failure {
    pub fn new(code: FailureCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            metadata: None,
        }
    }

    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn empty_input(what: &str) -> Self {
        Self::new(FailureCode::EmptyInput, format!("{what} must not be empty"))
    }

    pub fn invalid_tolerance(value: f64) -> Self {
        Self::new(
            FailureCode::InvalidTolerance,
            format!("tolerance must be finite and non-negative, got {value}"),
        )
    }

    pub fn invalid_k(k: usize, population: usize) -> Self {
        Self::new(
            FailureCode::InvalidK,
            format!("k must be in 1..={population}, got {k}"),
        )
        .with_metadata(json!({ "k": k, "population": population }))
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(FailureCode::InvalidArgument, message)
    }

    /// `kind` names the collection (e.g. "curve", "ray"), `index` the position
    /// of the offending primitive in it.
    pub fn geometry_invalid(kind: &str, index: usize) -> Self {
        Self::new(
            FailureCode::GeometryInvalid,
            format!("{kind} {index} is not valid"),
        )
        .with_metadata(json!({ "kind": kind, "index": index }))
    }

    /// Wrap an error returned by the kernel.
    pub fn oracle_error(operation: &str, indices: &[usize], error: &OracleError) -> Self {
        Self::new(
            FailureCode::OracleFault,
            format!("{operation} failed: {error}"),
        )
        .with_metadata(json!({
            "fault": "error",
            "error_type": error.kind(),
            "operation": operation,
            "indices": indices,
            "detail": error.to_string(),
        }))
    }

    /// Wrap a panic raised inside a kernel call.
    pub fn oracle_panic(operation: &str, indices: &[usize], payload: &(dyn Any + Send)) -> Self {
        let detail = payload
            .downcast_ref::<&str>()
            .map(|s| (*s).to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string panic payload".to_string());
        Self::new(
            FailureCode::OracleFault,
            format!("{operation} panicked: {detail}"),
        )
        .with_metadata(json!({
            "fault": "panic",
            "operation": operation,
            "indices": indices,
            "detail": detail,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_uses_stable_code() {
        let f = Failure::empty_input("points");
        assert_eq!(f.to_string(), "EmptyInput: points must not be empty");
        assert_eq!(FailureCode::InvalidTolerance.as_str(), "InvalidTolerance");
    }

    #[test]
    fn test_geometry_invalid_names_index() {
        let f = Failure::geometry_invalid("curve", 3);
        assert_eq!(f.code, FailureCode::GeometryInvalid);
        assert_eq!(f.metadata.as_ref().unwrap()["index"], 3);
    }

    #[test]
    fn test_panic_payloads() {
        let payload: Box<dyn Any + Send> = Box::new("boom");
        let f = Failure::oracle_panic("intersect_curves", &[0, 1], payload.as_ref());
        assert_eq!(f.code, FailureCode::OracleFault);
        assert_eq!(f.metadata.as_ref().unwrap()["detail"], "boom");

        let payload: Box<dyn Any + Send> = Box::new(String::from("owned"));
        let f = Failure::oracle_panic("intersect_curves", &[2], payload.as_ref());
        assert_eq!(f.metadata.as_ref().unwrap()["indices"], json!([2]));
        assert!(f.message.contains("owned"));
    }
}
