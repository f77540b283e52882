// tests/common/mod.rs
//
// A local stand-in for the affiliate site, social API, dashboard and
// campaign endpoint. Bound to 127.0.0.1:0 so tests never leave the box.
#![allow(dead_code)]

use axum::{
    extract::State,
    http::StatusCode,
    response::Html,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const WEBSITE_HTML: &str = include_str!("../fixtures/website_stats.html");

#[derive(Clone, Default)]
pub struct Captured {
    pub dashboard: Arc<Mutex<Vec<Value>>>,
    pub actions: Arc<Mutex<Vec<Value>>>,
}

impl Captured {
    pub fn dashboard_posts(&self) -> Vec<Value> {
        self.dashboard.lock().unwrap().clone()
    }

    pub fn actions(&self) -> Vec<Value> {
        self.actions.lock().unwrap().clone()
    }
}

pub fn affiliate_backend(captured: Captured) -> Router {
    Router::new()
        .route("/website/stats", get(|| async { Html(WEBSITE_HTML) }))
        .route(
            "/social/affiliates",
            get(|| async {
                Json(json!({
                    "data": { "clicks": 50, "conversions": 2, "engagement": "1,200" }
                }))
            }),
        )
        .route(
            "/slow",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Json(json!({ "clicks": 1 }))
            }),
        )
        .route(
            "/broken",
            get(|| async { (StatusCode::SERVICE_UNAVAILABLE, "maintenance") }),
        )
        .route("/dashboard", post(record_dashboard))
        .route(
            "/dashboard-down",
            post(|| async { StatusCode::INTERNAL_SERVER_ERROR }),
        )
        .route("/actions", post(record_action))
        .with_state(captured)
}

async fn record_dashboard(State(c): State<Captured>, Json(body): Json<Value>) -> StatusCode {
    c.dashboard.lock().unwrap().push(body);
    StatusCode::OK
}

/// Rejects `scale_traffic` so callers can observe a partial apply.
async fn record_action(State(c): State<Captured>, Json(body): Json<Value>) -> StatusCode {
    let rejected = body["action"] == "scale_traffic";
    c.actions.lock().unwrap().push(body);
    if rejected {
        StatusCode::UNPROCESSABLE_ENTITY
    } else {
        StatusCode::OK
    }
}

pub async fn serve(app: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind test listener");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("test server");
    });
    addr
}

/// Config with the two healthy sources pointed at `addr`.
pub fn config_json(addr: SocketAddr, extra: Value) -> Value {
    let mut cfg = json!({
        "collector": { "default_timeout_ms": 2000 },
        "sources": [
            {
                "name": "website",
                "kind": "html",
                "url": format!("http://{addr}/website/stats"),
                "fields": {
                    "clicks": "Clicks:\\s*([\\d,]+)",
                    "conversions": "Conversions:\\s*([\\d,]+)"
                }
            },
            {
                "name": "social",
                "kind": "json",
                "url": format!("http://{addr}/social/affiliates"),
                "fields": {
                    "clicks": "/data/clicks",
                    "conversions": "/data/conversions",
                    "engagement": "/data/engagement"
                }
            }
        ],
        "scheduler": { "enabled": false }
    });
    if let (Some(base), Some(more)) = (cfg.as_object_mut(), extra.as_object()) {
        for (k, v) in more {
            base.insert(k.clone(), v.clone());
        }
    }
    cfg
}
