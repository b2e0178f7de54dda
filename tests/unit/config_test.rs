//! Tests for configuration validation and loading

use std::collections::HashMap;

use async_inference_gate::config::GateConfig;

#[test]
fn test_default_config_is_valid() {
    let cfg = GateConfig::default();
    assert!(cfg.validate().is_ok());
    assert_eq!(cfg.ledger_table, "async-inf-jobs");
    assert_eq!(cfg.jobs_limit, 1);
    assert_eq!(cfg.instance_count, 1);
    assert_eq!(cfg.instance_type, "ml.g4dn.xlarge");
    assert_eq!(cfg.max_in_flight_query, 100);
}

#[test]
fn test_config_invalid_limit() {
    let cfg = GateConfig {
        jobs_limit: 0,
        ..GateConfig::default()
    };
    assert!(cfg.validate().is_err());
}

#[test]
fn test_config_invalid_allow_list() {
    let cfg = GateConfig {
        allow_list: " , ".into(),
        ..GateConfig::default()
    };
    assert!(cfg.validate().is_err());
}

#[test]
fn test_config_invalid_query_cap() {
    let cfg = GateConfig {
        max_in_flight_query: 0,
        ..GateConfig::default()
    };
    assert!(cfg.validate().is_err());
}

#[test]
fn test_config_from_json_partial() {
    let json = r#"{
        "jobs_limit": 3,
        "allow_list": "kwm-model-a,kwm-model-c",
        "region": "cn-north-1"
    }"#;

    let cfg = GateConfig::from_json_str(json).unwrap();
    assert_eq!(cfg.jobs_limit, 3);
    assert_eq!(cfg.region, "cn-north-1");
    assert_eq!(cfg.ledger_table, "async-inf-jobs");
}

#[test]
fn test_config_from_json_rejects_invalid() {
    assert!(GateConfig::from_json_str(r#"{"jobs_limit": 0}"#).is_err());
    assert!(GateConfig::from_json_str("not json").is_err());
}

#[test]
fn test_config_from_lookup() {
    let vars: HashMap<&str, &str> = [
        ("GATE_JOBS_LIMIT", "2"),
        ("GATE_S3_BUCKET", "bucket-b"),
        ("GATE_SERIALIZE_ADMISSION", "true"),
        ("AWS_REGION", "eu-west-1"),
    ]
    .into_iter()
    .collect();

    let cfg = GateConfig::from_lookup(|k| vars.get(k).map(|v| (*v).to_string())).unwrap();
    assert_eq!(cfg.jobs_limit, 2);
    assert_eq!(cfg.s3_bucket, "bucket-b");
    assert!(cfg.serialize_admission);
    assert_eq!(cfg.region, "eu-west-1");
}

#[test]
fn test_config_from_lookup_bad_number() {
    let result = GateConfig::from_lookup(|k| (k == "GATE_JOBS_LIMIT").then(|| "lots".to_string()));
    let err = result.unwrap_err();
    assert!(format!("{err:#}").contains("GATE_JOBS_LIMIT"));
}
