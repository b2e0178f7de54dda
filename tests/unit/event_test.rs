//! Tests for inbound event classification

use async_inference_gate::core::{GateError, InboundEvent, JobStatus, StageLimit};
use serde_json::json;

#[test]
fn test_completion_event_shape() {
    let raw = json!({
        "detail": {
            "TrainingJobName": "kwm-model-a-job-2024-01-01-00-00-00",
            "TrainingJobStatus": "Completed",
            "OutputDataConfig": { "S3OutputPath": "s3://bucket/output/" }
        }
    });

    match InboundEvent::from_value(&raw).unwrap() {
        InboundEvent::Completion(ev) => {
            assert_eq!(ev.job_name, "kwm-model-a-job-2024-01-01-00-00-00");
            assert_eq!(ev.status, JobStatus::Completed);
            assert_eq!(ev.output_location(), "s3://bucket/output/");
        }
        other => panic!("unexpected event: {other:?}"),
    }
}

#[test]
fn test_completion_event_without_output() {
    let raw = json!({
        "detail": { "TrainingJobName": "x", "TrainingJobStatus": "Stopped" }
    });
    match InboundEvent::from_value(&raw).unwrap() {
        InboundEvent::Completion(ev) => {
            assert_eq!(ev.status, JobStatus::Stopped);
            assert_eq!(ev.output_location(), "");
        }
        other => panic!("unexpected event: {other:?}"),
    }
}

#[test]
fn test_completion_event_missing_name_is_malformed() {
    let raw = json!({ "detail": { "TrainingJobStatus": "Completed" } });
    assert!(matches!(
        InboundEvent::from_value(&raw),
        Err(GateError::MalformedRequest(_))
    ));
}

#[test]
fn test_new_request_with_stage_variables() {
    let raw = json!({
        "body": "{\"type\": \"kwm-model-a\", \"instance_count\": 2}",
        "stageVariables": { "limit": "3", "s3_bucket": "b" }
    });

    match InboundEvent::from_value(&raw).unwrap() {
        InboundEvent::NewRequest(req) => {
            let payload = req.payload.unwrap();
            assert_eq!(payload.category.as_deref(), Some("kwm-model-a"));
            assert_eq!(payload.instance_count, Some(2));
            assert_eq!(payload.instance_type, None);
            assert_eq!(req.stage_variables.limit, Some(StageLimit::Text("3".into())));
            assert_eq!(req.stage_variables.s3_bucket.as_deref(), Some("b"));
        }
        other => panic!("unexpected event: {other:?}"),
    }
}

#[test]
fn test_empty_body_has_no_payload() {
    for raw in [json!({ "body": "{}" }), json!({ "body": "" }), json!({})] {
        match InboundEvent::from_value(&raw).unwrap() {
            InboundEvent::NewRequest(req) => assert!(req.payload.is_none()),
            other => panic!("unexpected event: {other:?}"),
        }
    }
}

#[test]
fn test_invalid_body_json() {
    let raw = json!({ "body": "{not json" });
    assert!(matches!(
        InboundEvent::from_value(&raw),
        Err(GateError::MalformedRequest(_))
    ));
}
