// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Throw-away local servers imitating the providers.

use crate::{NominatimConfig, OpenRouteServiceConfig};
use axum::Router;
use axum::extract::{Json, Path, Query};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Three points, the usual worked example of the encoding.
pub const SAMPLE_POLYLINE: &str = "_p~iF~ps|U_ulLnnqC_mqNvxq`@";

#[derive(Debug, Clone, Default)]
pub struct RecordedRequest {
    pub path: String,
    pub authorization: Option<String>,
    pub user_agent: Option<String>,
    pub query: HashMap<String, String>,
    pub body: Option<Value>,
}

pub type Recorded = Arc<Mutex<Vec<RecordedRequest>>>;

pub struct FakeProvider {
    pub base_url: String,
    pub recorded: Recorded,
}

impl FakeProvider {
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.recorded.lock().unwrap().clone()
    }
}

fn header(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(String::from)
}

async fn serve(router: Router) -> String {
    let listener: tokio::net::TcpListener =
        tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address: std::net::SocketAddr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{address}")
}

/// What the fake directions endpoint answers with.
#[derive(Debug, Clone)]
pub struct Reply {
    pub status: StatusCode,
    pub body: Value,
    pub delay: Duration,
}

impl Reply {
    pub fn ok(body: Value) -> Self {
        Self {
            status: StatusCode::OK,
            body,
            delay: Duration::ZERO,
        }
    }
}

pub fn create_test_route_body(distance_m: f64, duration_s: f64) -> Value {
    serde_json::json!({
        "routes": [{
            "summary": { "distance": distance_m, "duration": duration_s },
            "geometry": SAMPLE_POLYLINE,
        }]
    })
}

pub async fn spawn_directions_provider(reply: Reply) -> FakeProvider {
    let recorded: Recorded = Recorded::default();
    let log: Recorded = Arc::clone(&recorded);
    let router: Router = Router::new().route(
        "/v2/directions/{profile}",
        post(
            move |Path(profile): Path<String>, headers: HeaderMap, Json(body): Json<Value>| {
                let reply: Reply = reply.clone();
                let log: Recorded = Arc::clone(&log);
                async move {
                    log.lock().unwrap().push(RecordedRequest {
                        path: profile,
                        authorization: header(&headers, "authorization"),
                        user_agent: header(&headers, "user-agent"),
                        query: HashMap::new(),
                        body: Some(body),
                    });
                    tokio::time::sleep(reply.delay).await;
                    (reply.status, Json(reply.body))
                }
            },
        ),
    );
    FakeProvider {
        base_url: serve(router).await,
        recorded,
    }
}

/// Answers each `accept-language` with its entry in `results`; languages
/// without an entry get a 500.
pub async fn spawn_geocoder(results: HashMap<&'static str, Value>) -> FakeProvider {
    let recorded: Recorded = Recorded::default();
    let log: Recorded = Arc::clone(&recorded);
    let results: Arc<HashMap<&'static str, Value>> = Arc::new(results);
    let router: Router = Router::new().route(
        "/search",
        get(
            move |Query(query): Query<HashMap<String, String>>, headers: HeaderMap| {
                let results: Arc<HashMap<&'static str, Value>> = Arc::clone(&results);
                let log: Recorded = Arc::clone(&log);
                async move {
                    let language: String =
                        query.get("accept-language").cloned().unwrap_or_default();
                    log.lock().unwrap().push(RecordedRequest {
                        path: String::from("search"),
                        authorization: None,
                        user_agent: header(&headers, "user-agent"),
                        query,
                        body: None,
                    });
                    match results.get(language.as_str()) {
                        Some(body) => (StatusCode::OK, Json(body.clone())),
                        None => (
                            StatusCode::INTERNAL_SERVER_ERROR,
                            Json(serde_json::json!({ "error": "unavailable" })),
                        ),
                    }
                }
            },
        ),
    );
    FakeProvider {
        base_url: serve(router).await,
        recorded,
    }
}

pub fn create_test_directions_config(base_url: &str) -> OpenRouteServiceConfig {
    OpenRouteServiceConfig {
        base_url: base_url.to_string(),
        api_key: Some(String::from("test-key")),
        ..OpenRouteServiceConfig::default()
    }
}

pub fn create_test_geocoder_config(base_url: &str) -> NominatimConfig {
    NominatimConfig {
        base_url: base_url.to_string(),
        user_agent: String::from("fieldops-tests/1.0"),
        retry_delay: Duration::ZERO,
        ..NominatimConfig::default()
    }
}

pub fn place(lat: &str, lon: &str, importance: f64, name: &str) -> Value {
    serde_json::json!({
        "lat": lat,
        "lon": lon,
        "importance": importance,
        "display_name": name,
    })
}
