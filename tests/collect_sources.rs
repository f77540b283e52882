// tests/collect_sources.rs
//
// Collector against real HTTP sources served from a local axum app.

mod common;

use affiliate_optimizer::collect::providers::{build, http_client};
use affiliate_optimizer::collect::{Collector, SourceProvider};
use affiliate_optimizer::config::{CollectorConfig, SourceConfig};
use affiliate_optimizer::PipelineError;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

fn source(v: Value) -> SourceConfig {
    let cfg: SourceConfig = serde_json::from_value(v).expect("source config");
    cfg.validate().expect("valid source");
    cfg
}

fn providers(addr: SocketAddr, extra: &[Value]) -> Vec<Arc<dyn SourceProvider>> {
    let client = http_client(&CollectorConfig::default()).unwrap();
    let mut specs = vec![
        json!({
            "name": "website",
            "kind": "html",
            "url": format!("http://{addr}/website/stats"),
            "fields": { "clicks": "Clicks:\\s*([\\d,]+)", "conversions": "Conversions:\\s*([\\d,]+)" }
        }),
        json!({
            "name": "social",
            "kind": "json",
            "url": format!("http://{addr}/social/affiliates"),
            "fields": { "clicks": "/data/clicks", "engagement": "/data/engagement", "missing": "/data/nope" }
        }),
    ];
    specs.extend(extra.iter().cloned());
    specs
        .into_iter()
        .map(|v| build(&source(v), &client).unwrap())
        .collect()
}

#[tokio::test]
async fn html_and_json_sources_yield_records() {
    let addr = common::serve(common::affiliate_backend(Default::default())).await;
    let out = Collector::new(providers(addr, &[]), Duration::from_secs(2))
        .collect()
        .await
        .unwrap();

    assert_eq!(out.len(), 2);
    assert!(out.failures().is_empty());

    let web = out.get("website").unwrap();
    // script/style contents must not leak into the scraped text
    assert_eq!(web["clicks"], json!("100"));
    assert_eq!(web["conversions"], json!("10"));

    let social = out.get("social").unwrap();
    assert_eq!(social["clicks"], json!(50));
    assert_eq!(social["engagement"], json!("1,200"));
    assert!(!social.contains_key("missing"));
}

#[tokio::test]
async fn slow_source_times_out_without_blocking_the_others() {
    let addr = common::serve(common::affiliate_backend(Default::default())).await;
    let slow = json!({
        "name": "slowpoke",
        "kind": "json",
        "url": format!("http://{addr}/slow"),
        "timeout_ms": 200,
        "fields": { "clicks": "/clicks" }
    });
    let collector = Collector::new(providers(addr, &[slow]), Duration::from_secs(2));

    let t0 = Instant::now();
    let out = collector.collect().await.unwrap();
    assert!(
        t0.elapsed() < Duration::from_secs(3),
        "collect waited on the slow source: {:?}",
        t0.elapsed()
    );

    assert_eq!(out.len(), 2);
    assert!(out.get("slowpoke").is_none());
    assert_eq!(out.failures().len(), 1);
    match &out.failures()[0] {
        PipelineError::SourceUnavailable {
            source_name,
            reason,
        } => {
            assert_eq!(source_name, "slowpoke");
            assert!(reason.contains("timed out"), "reason: {reason}");
        }
        other => panic!("unexpected failure: {other:?}"),
    }
}

#[tokio::test]
async fn non_2xx_is_a_source_failure() {
    let addr = common::serve(common::affiliate_backend(Default::default())).await;
    let broken = json!({
        "name": "partner",
        "kind": "json",
        "url": format!("http://{addr}/broken"),
        "fields": { "clicks": "/clicks" }
    });
    let out = Collector::new(providers(addr, &[broken]), Duration::from_secs(2))
        .collect()
        .await
        .unwrap();
    assert_eq!(out.len(), 2);
    let reason = out.failures()[0].to_string();
    assert!(reason.contains("partner") && reason.contains("503"), "{reason}");
}

#[tokio::test]
async fn every_source_down_is_no_data() {
    let addr = common::serve(common::affiliate_backend(Default::default())).await;
    let client = http_client(&CollectorConfig::default()).unwrap();
    let only: Vec<Arc<dyn SourceProvider>> = ["a", "b"]
        .iter()
        .map(|n| {
            let cfg = source(json!({
                "name": n,
                "kind": "json",
                "url": format!("http://{addr}/broken"),
                "fields": { "clicks": "/clicks" }
            }));
            build(&cfg, &client).unwrap()
        })
        .collect();
    let err = Collector::new(only, Duration::from_secs(2))
        .collect()
        .await
        .unwrap_err();
    assert_eq!(err, PipelineError::NoDataAvailable { attempted: 2 });
}
