#![allow(dead_code)]

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    body::{to_bytes, Body},
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

use ffco_api::auth::issue_token;
use ffco_api::config::AppConfig;
use ffco_api::database::seed::{seed, DemoData};
use ffco_api::database::Database;
use ffco_api::handlers::{router, AppState};
use ffco_api::storage::{MemoryBlobStore, MemoryDocumentStore, MemoryNotifier, MemoryQueue, Storage};

pub const BOUNDARY: &str = "ffco-test-boundary";

/// In-process app over a freshly seeded memory database
pub struct TestApp {
    pub router: Router,
    pub demo: DemoData,
    pub db: Database,
    pub queue: Arc<MemoryQueue>,
    pub blobs: Arc<MemoryBlobStore>,
    pub notifier: Arc<MemoryNotifier>,
    pub config: AppConfig,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub bytes: Vec<u8>,
    pub body: Value,
}

impl TestResponse {
    /// `code` of every entry in a failure envelope
    pub fn error_codes(&self) -> Vec<String> {
        self.body["errors"]
            .as_array()
            .map(|errors| {
                errors
                    .iter()
                    .filter_map(|e| e["code"].as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl TestApp {
    pub async fn spawn() -> Result<Self> {
        let db = Database::memory();
        let demo = seed(&db).await.context("failed to seed demo data")?;

        let queue = Arc::new(MemoryQueue::new());
        let blobs = Arc::new(MemoryBlobStore::new("memory://blobs"));
        let notifier = Arc::new(MemoryNotifier::new());
        let storage = Storage {
            blobs: blobs.clone(),
            documents: Arc::new(MemoryDocumentStore::new()),
            queue: queue.clone(),
            notifier: notifier.clone(),
        };

        let config = AppConfig::development();
        let router = router(AppState::new(config.clone(), db.clone(), storage));

        Ok(Self {
            router,
            demo,
            db,
            queue,
            blobs,
            notifier,
            config,
        })
    }

    pub fn token_for(&self, user_id: Uuid) -> String {
        issue_token(user_id, Some("test".to_string()), &self.config.security).expect("token signing")
    }

    /// Token for the seeded member of tenant A
    pub fn user_token(&self) -> String {
        self.token_for(self.demo.user)
    }

    pub async fn send(&self, request: Request<Body>) -> Result<TestResponse> {
        let response = self.router.clone().oneshot(request).await?;
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX).await?.to_vec();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        Ok(TestResponse { status, headers, bytes, body })
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> Result<TestResponse> {
        self.send(request(Method::GET, uri, token, Body::empty())?).await
    }

    pub async fn delete(&self, uri: &str, token: Option<&str>) -> Result<TestResponse> {
        self.send(request(Method::DELETE, uri, token, Body::empty())?).await
    }

    pub async fn json(&self, method: Method, uri: &str, token: Option<&str>, body: &Value) -> Result<TestResponse> {
        let mut req = request(method, uri, token, Body::from(serde_json::to_vec(body)?))?;
        req.headers_mut()
            .insert(header::CONTENT_TYPE, "application/json".parse()?);
        self.send(req).await
    }

    pub async fn raw(&self, method: Method, uri: &str, token: Option<&str>, body: &'static str) -> Result<TestResponse> {
        let mut req = request(method, uri, token, Body::from(body))?;
        req.headers_mut()
            .insert(header::CONTENT_TYPE, "application/json".parse()?);
        self.send(req).await
    }

    pub async fn multipart(&self, uri: &str, token: Option<&str>, parts: &[Part<'_>]) -> Result<TestResponse> {
        let mut req = request(Method::POST, uri, token, Body::from(multipart_body(parts)))?;
        req.headers_mut().insert(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY).parse()?,
        );
        self.send(req).await
    }
}

fn request(method: Method, uri: &str, token: Option<&str>, body: Body) -> Result<Request<Body>> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    Ok(builder.body(body)?)
}

pub enum Part<'a> {
    Text(&'a str, &'a str),
    File(&'a str, &'a [u8]),
}

fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match part {
            Part::Text(name, value) => {
                body.extend_from_slice(format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name).as_bytes());
                body.extend_from_slice(value.as_bytes());
            }
            Part::File(file_name, bytes) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\nContent-Type: application/json\r\n\r\n",
                        file_name
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(bytes);
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}
