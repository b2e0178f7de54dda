//! Tests for error types

use async_inference_gate::core::GateError;

#[test]
fn test_missing_type_error() {
    let err = GateError::MissingType;
    assert_eq!(err.status_code(), 501);
    assert_eq!(
        format!("{}", err),
        "missing \"type\" in your request, please check and try again."
    );
}

#[test]
fn test_unsupported_category_error() {
    let err = GateError::UnsupportedCategory("unknown-model".to_string());
    assert_eq!(err.status_code(), 510);
    assert_eq!(
        format!("{}", err),
        "The type [unknown-model] of inference request is NOT supported."
    );
    assert!(err.is_client_error());
}

#[test]
fn test_capacity_exceeded_error() {
    let err = GateError::CapacityExceeded { limit: 1 };
    assert_eq!(err.status_code(), 502);
    assert!(format!("{}", err).contains("limit 1 got reached"));
    assert!(!err.is_client_error());
    assert!(!err.is_collaborator_error());
}

#[test]
fn test_collaborator_errors_map_to_500() {
    for err in [
        GateError::NotFound("table".into()),
        GateError::Conflict("dup".into()),
        GateError::Backend("connection failed".into()),
    ] {
        assert_eq!(err.status_code(), 500);
        assert!(err.is_collaborator_error());
    }
    assert_eq!(
        format!("{}", GateError::Backend("connection failed".into())),
        "backend error: connection failed"
    );
}

#[test]
fn test_malformed_request_error() {
    let err = GateError::MalformedRequest("body".into());
    assert_eq!(err.status_code(), 400);
    assert!(err.is_client_error());
}
