//! Soft delete detection
//!
//! The API keeps returning some records with status 200 after they were
//! deleted, marking them with a deletion timestamp instead.

use serde_json::Value;

use crate::error::{AsaError, Result};

/// Fields whose presence marks a record as deleted
const DELETION_MARKERS: &[&str] = &["deleted_at", "removed_at"];

/// Check whether a response body describes a soft-deleted record
///
/// Fails only when the body is not JSON at all.
pub fn check_soft_delete(body: &str) -> Result<bool> {
    let value: Value =
        serde_json::from_str(body).map_err(|e| AsaError::decode("soft delete marker", e))?;

    Ok(DELETION_MARKERS
        .iter()
        .any(|field| is_marker_set(value.get(field))))
}

fn is_marker_set(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::String(s)) => !s.is_empty(),
        Some(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deleted_at_timestamp_marks_deleted() {
        let body = r#"{"name":"web","deleted_at":"2021-06-11T15:55:21Z"}"#;
        assert!(check_soft_delete(body).unwrap());
    }

    #[test]
    fn test_removed_at_marks_deleted() {
        assert!(check_soft_delete(r#"{"removed_at":"2021-06-11T15:55:21Z"}"#).unwrap());
    }

    #[test]
    fn test_null_or_empty_marker_is_live() {
        assert!(!check_soft_delete(r#"{"name":"web","deleted_at":null}"#).unwrap());
        assert!(!check_soft_delete(r#"{"name":"web","deleted_at":""}"#).unwrap());
        assert!(!check_soft_delete(r#"{"name":"web"}"#).unwrap());
    }

    #[test]
    fn test_non_object_json_is_live() {
        assert!(!check_soft_delete("[]").unwrap());
        assert!(!check_soft_delete("\"web\"").unwrap());
    }

    #[test]
    fn test_invalid_json_is_decode_error() {
        let err = check_soft_delete("<html>").unwrap_err();
        assert!(matches!(err, AsaError::Decode { .. }));
    }
}
