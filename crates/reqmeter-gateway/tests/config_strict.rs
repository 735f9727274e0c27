#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::collections::HashMap;

use reqmeter_gateway::config::{self, GatewayConfig, RouteLabel};

#[test]
fn deny_unknown_fields_nested() {
    let bad = r#"
version: 1
metrics:
  route_lable: raw_path # typo should fail
"#;

    let err = config::load_from_str(bad).expect_err("must fail");
    assert_eq!(err.code().as_str(), "BAD_REQUEST");
}

#[test]
fn ok_minimal_config() {
    let cfg = config::load_from_str("version: 1\n").expect("must parse");
    assert_eq!(cfg.version, 1);
    assert_eq!(cfg.gateway.listen, "0.0.0.0:3000");
    assert_eq!(cfg.gateway.heavy_task_delay_ms, 5000);
    assert_eq!(cfg.metrics.route_label, RouteLabel::RawPath);
    assert_eq!(cfg.metrics.duration_buckets, vec![0.1, 0.5, 1.0, 2.5, 5.0, 10.0]);
    assert_eq!(cfg.log_sink.endpoint(), "http://localhost:3100");
}

#[test]
fn full_config() {
    let ok = r#"
version: 1
gateway:
  listen: "127.0.0.1:9000"
  heavy_task_delay_ms: 250
metrics:
  route_label: matched_template
  max_series_per_metric: 500
  process_metrics: false
  duration_buckets: [0.05, 0.2, 1]
log_sink:
  host: loki.internal
  port: 3101
  job: node-app
"#;
    let cfg = config::load_from_str(ok).expect("must parse");
    assert_eq!(cfg.metrics.route_label, RouteLabel::MatchedTemplate);
    assert_eq!(cfg.metrics.max_series_per_metric, 500);
    assert!(!cfg.metrics.process_metrics);
    assert_eq!(cfg.log_sink.endpoint(), "http://loki.internal:3101");
    assert_eq!(cfg.log_sink.job, "node-app");
}

#[test]
fn rejects_bad_values() {
    let unsorted = "version: 1\nmetrics:\n  duration_buckets: [1, 0.5]\n";
    assert!(config::load_from_str(unsorted).is_err());

    let listen = "version: 1\ngateway:\n  listen: \"not-an-addr\"\n";
    assert!(config::load_from_str(listen).is_err());

    let version = "version: 2\n";
    let err = config::load_from_str(version).expect_err("must fail");
    assert_eq!(err.code().as_str(), "BAD_REQUEST");
}

#[test]
fn env_overrides_log_sink() {
    let env: HashMap<&str, &str> = [("MY_HOST", "10.0.0.7"), ("LOG_SINK_PORT", "3200")].into();
    let mut cfg = GatewayConfig::default();
    config::apply_env(&mut cfg, |k| env.get(k).map(|v| v.to_string())).unwrap();
    assert_eq!(cfg.log_sink.endpoint(), "http://10.0.0.7:3200");

    // LOG_SINK_HOST wins over MY_HOST
    let env: HashMap<&str, &str> = [("MY_HOST", "a"), ("LOG_SINK_HOST", "b")].into();
    let mut cfg = GatewayConfig::default();
    config::apply_env(&mut cfg, |k| env.get(k).map(|v| v.to_string())).unwrap();
    assert_eq!(cfg.log_sink.host, "b");

    let env: HashMap<&str, &str> = [("LOG_SINK_PORT", "loki")].into();
    let mut cfg = GatewayConfig::default();
    let err = config::apply_env(&mut cfg, |k| env.get(k).map(|v| v.to_string())).unwrap_err();
    assert_eq!(err.code().as_str(), "BAD_REQUEST");
}
