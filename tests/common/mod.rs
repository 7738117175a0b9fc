//! In-process mock of the identification service.
//!
//! Binds an axum router on a random local port. Replies are scripted per
//! endpoint; every upload and fetch is recorded for assertions.

#![allow(dead_code)]

use std::io::Cursor;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use medscan::ServiceConfig;
use serde_json::{json, Value};

/// Scripted reply of one endpoint.
#[derive(Debug, Clone)]
pub enum Reply {
    Json(Value),
    Status(u16),
    Hang,
}

#[derive(Debug, Clone)]
pub struct ReceivedPart {
    pub name: String,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

struct MockState {
    upload: Reply,
    result: Reply,
    uploads: Mutex<Vec<Vec<ReceivedPart>>>,
    fetched: Mutex<Vec<String>>,
}

pub struct MockIdentificationService {
    pub addr: SocketAddr,
    state: Arc<MockState>,
}

impl MockIdentificationService {
    pub async fn start(upload: Reply, result: Reply) -> Self {
        let state = Arc::new(MockState {
            upload,
            result,
            uploads: Mutex::new(Vec::new()),
            fetched: Mutex::new(Vec::new()),
        });

        let app = Router::new()
            .route("/api/upload_images", post(upload_images))
            .route("/api/get_results/:scan_id", get(get_results))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { addr, state }
    }

    /// Upload answers `{"scan_id": "abc"}`, results answer `result`.
    pub async fn healthy(result: Value) -> Self {
        Self::start(Reply::Json(json!({ "scan_id": "abc" })), Reply::Json(result)).await
    }

    pub fn config(&self) -> ServiceConfig {
        let mut config = ServiceConfig::new(
            &format!("http://{}/api/upload_images", self.addr),
            &format!("http://{}/api/get_results/{{scan_id}}", self.addr),
        )
        .unwrap();
        config.analysis_timeout = Some(Duration::from_secs(5));
        config
    }

    pub fn uploads(&self) -> Vec<Vec<ReceivedPart>> {
        self.state.uploads.lock().unwrap().clone()
    }

    pub fn fetched(&self) -> Vec<String> {
        self.state.fetched.lock().unwrap().clone()
    }
}

async fn upload_images(State(state): State<Arc<MockState>>, mut multipart: Multipart) -> Response {
    let mut parts = Vec::new();
    while let Ok(Some(field)) = multipart.next_field().await {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await.map(|b| b.to_vec()).unwrap_or_default();
        parts.push(ReceivedPart {
            name,
            file_name,
            content_type,
            bytes,
        });
    }
    state.uploads.lock().unwrap().push(parts);
    reply(&state.upload).await
}

async fn get_results(State(state): State<Arc<MockState>>, Path(scan_id): Path<String>) -> Response {
    state.fetched.lock().unwrap().push(scan_id);
    reply(&state.result).await
}

async fn reply(script: &Reply) -> Response {
    match script {
        Reply::Json(value) => Json(value.clone()).into_response(),
        Reply::Status(code) => (
            StatusCode::from_u16(*code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            "Internal Server Error",
        )
            .into_response(),
        Reply::Hang => std::future::pending().await,
    }
}

/// A small decodable image, `tag + 1` pixels wide.
pub fn encoded_as(tag: u8, format: ImageFormat) -> Vec<u8> {
    let pixels = RgbImage::from_pixel(u32::from(tag) + 1, 1, Rgb([tag, 128, 255 - tag]));
    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(pixels).write_to(&mut out, format).unwrap();
    out.into_inner()
}

pub fn jpeg_bytes(tag: u8) -> Vec<u8> {
    encoded_as(tag, ImageFormat::Jpeg)
}

pub fn png_bytes(tag: u8) -> Vec<u8> {
    encoded_as(tag, ImageFormat::Png)
}

/// HEIC container header; not decodable here, passed through as-is.
pub fn heic_bytes() -> Vec<u8> {
    let mut bytes = b"\0\0\0\x18ftypheic\0\0\0\0mif1heic".to_vec();
    bytes.extend_from_slice(&[0u8; 16]);
    bytes
}

pub fn paracetamol_json() -> Value {
    json!({
        "name": "Paracetamol",
        "dosage": "500mg",
        "manufacturer": "PharmaCorp Industries",
        "activeIngredient": "Acetaminophen",
        "uses": "Pain relief and fever reduction",
        "sideEffects": "Nausea, rash, or allergic reactions (rare)",
        "confidence": { "overall": 94.5, "yoloDetection": 96.8, "ocrAccuracy": 92.3 },
        "aiModels": { "detectionModel": "YOLOv8", "ocrModel": "Tesseract OCR" },
        "extractedText": "PARACETAMOL 500MG PHARMACORP INDUSTRIES"
    })
}
