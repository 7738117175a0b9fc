//! End-to-end scan flows against a mock identification service over HTTP.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{heic_bytes, jpeg_bytes, paracetamol_json, png_bytes, MockIdentificationService, Reply};
use medscan::{
    AnalysisError, AnalysisOrchestrator, AnalysisOutcome, AppEvent, CaptureSource,
    HttpIdentificationClient, IdentificationResult, IdentificationService, ImagePair, RawCapture,
    ScanApp, ScanId, Screen, ServiceConfig,
};
use serde_json::json;

async fn app_in_review(config: ServiceConfig) -> ScanApp {
    let mut app = ScanApp::from_config(config).unwrap();
    app.handle(AppEvent::StartScan).await.unwrap();
    app.handle(AppEvent::Capture {
        source: CaptureSource::Camera,
        raw: RawCapture::Bytes(jpeg_bytes(1)),
    })
    .await
    .unwrap();
    app.handle(AppEvent::Capture {
        source: CaptureSource::FileSelection,
        raw: RawCapture::Bytes(png_bytes(2)),
    })
    .await
    .unwrap();
    assert_eq!(app.screen(), Screen::ImageReview);
    app
}

fn assert_pair_intact(pair: Option<&ImagePair>) {
    let pair = pair.expect("pair kept after failure");
    assert_eq!(pair.front().unwrap().to_bytes(), jpeg_bytes(1));
    assert_eq!(pair.back().unwrap().to_bytes(), png_bytes(2));
}

fn failure(app: &ScanApp) -> AnalysisError {
    match app.last_outcome() {
        Some(AnalysisOutcome::Failed(err)) => err.clone(),
        other => panic!("expected failed analysis, got {other:?}"),
    }
}

#[tokio::test]
async fn test_round_trip() {
    medscan::telemetry::init_tracing(medscan::telemetry::DEFAULT_DIRECTIVE);
    let mock = MockIdentificationService::healthy(paracetamol_json()).await;
    let mut app = app_in_review(mock.config()).await;

    let screen = app.handle(AppEvent::Analyze).await.unwrap();

    assert_eq!(screen, Screen::Results);
    let expected = IdentificationResult::from_json(&paracetamol_json().to_string()).unwrap();
    assert_eq!(app.session().result(), Some(&expected));
    assert_eq!(mock.fetched(), vec!["abc".to_string()]);

    let uploads = mock.uploads();
    assert_eq!(uploads.len(), 1);
    let parts = &uploads[0];
    assert_eq!(parts.len(), 2);

    let front = parts.iter().find(|p| p.name == "front_image").unwrap();
    assert_eq!(front.bytes, jpeg_bytes(1));
    assert_eq!(front.file_name.as_deref(), Some("front.jpg"));
    assert_eq!(front.content_type.as_deref(), Some("image/jpeg"));

    let back = parts.iter().find(|p| p.name == "back_image").unwrap();
    assert_eq!(back.bytes, png_bytes(2));
    assert_eq!(back.file_name.as_deref(), Some("back.png"));
    assert_eq!(back.content_type.as_deref(), Some("image/png"));
}

#[tokio::test]
async fn test_heic_back_image_is_uploaded_as_is() {
    let mock = MockIdentificationService::healthy(paracetamol_json()).await;
    let mut app = ScanApp::from_config(mock.config()).unwrap();
    app.handle(AppEvent::StartScan).await.unwrap();
    app.handle(AppEvent::Capture {
        source: CaptureSource::Camera,
        raw: RawCapture::Bytes(jpeg_bytes(1)),
    })
    .await
    .unwrap();
    app.handle(AppEvent::Capture {
        source: CaptureSource::FileSelection,
        raw: RawCapture::Bytes(heic_bytes()),
    })
    .await
    .unwrap();

    assert_eq!(app.handle(AppEvent::Analyze).await.unwrap(), Screen::Results);

    let uploads = mock.uploads();
    let back = uploads[0].iter().find(|p| p.name == "back_image").unwrap();
    assert_eq!(back.bytes, heic_bytes());
    assert_eq!(back.file_name.as_deref(), Some("back.heic"));
    assert_eq!(back.content_type.as_deref(), Some("image/heic"));
}

#[tokio::test]
async fn test_upload_http_500_returns_to_review() {
    let mock = MockIdentificationService::start(Reply::Status(500), Reply::Json(paracetamol_json())).await;
    let mut app = app_in_review(mock.config()).await;

    let screen = app.handle(AppEvent::Analyze).await.unwrap();

    assert_eq!(screen, Screen::ImageReview);
    assert_pair_intact(app.session().images());
    assert!(app.session().result().is_none());
    assert!(matches!(failure(&app), AnalysisError::Upload { status: 500, .. }));
    assert!(mock.fetched().is_empty());

    let notice = app.session().notice().unwrap();
    assert!(notice.detail.as_deref().unwrap().contains("HTTP 500"));
}

#[tokio::test]
async fn test_missing_identifier_never_fetches() {
    let mock = MockIdentificationService::start(
        Reply::Json(json!({ "status": "queued" })),
        Reply::Json(paracetamol_json()),
    )
    .await;
    let mut app = app_in_review(mock.config()).await;

    app.handle(AppEvent::Analyze).await.unwrap();

    assert_eq!(app.screen(), Screen::ImageReview);
    let err = failure(&app);
    assert_eq!(err, AnalysisError::MissingIdentifier);
    assert!(err.is_contract_violation());
    assert!(mock.fetched().is_empty());
}

#[tokio::test]
async fn test_malformed_result_returns_to_review() {
    let mut body = paracetamol_json();
    body.as_object_mut().unwrap().remove("confidence");
    let mock = MockIdentificationService::healthy(body).await;
    let mut app = app_in_review(mock.config()).await;

    app.handle(AppEvent::Analyze).await.unwrap();

    assert_eq!(app.screen(), Screen::ImageReview);
    assert_pair_intact(app.session().images());
    assert!(app.session().result().is_none());
    assert!(matches!(failure(&app), AnalysisError::MalformedResult { .. }));
}

#[tokio::test]
async fn test_fetch_http_404() {
    let mock = MockIdentificationService::start(
        Reply::Json(json!({ "scan_id": "abc" })),
        Reply::Status(404),
    )
    .await;
    let mut app = app_in_review(mock.config()).await;

    app.handle(AppEvent::Analyze).await.unwrap();

    assert_eq!(app.screen(), Screen::ImageReview);
    assert!(matches!(failure(&app), AnalysisError::Fetch { status: 404, .. }));
}

#[tokio::test]
async fn test_hung_upload_times_out() {
    let mock = MockIdentificationService::start(Reply::Hang, Reply::Json(paracetamol_json())).await;
    let mut config = mock.config();
    config.analysis_timeout = Some(Duration::from_millis(200));
    let mut app = app_in_review(config).await;

    app.handle(AppEvent::Analyze).await.unwrap();

    assert_eq!(app.screen(), Screen::ImageReview);
    assert_pair_intact(app.session().images());
    assert_eq!(
        failure(&app),
        AnalysisError::TimedOut {
            after: Duration::from_millis(200)
        }
    );
}

#[tokio::test]
async fn test_retry_after_failure_submits_same_pair() {
    let failing = MockIdentificationService::start(Reply::Status(503), Reply::Status(503)).await;
    let healthy = MockIdentificationService::healthy(paracetamol_json()).await;

    let mut app = app_in_review(failing.config()).await;
    app.handle(AppEvent::Analyze).await.unwrap();
    assert_eq!(app.screen(), Screen::ImageReview);

    // Same session, pointed at a service that answers
    let client = HttpIdentificationClient::new(healthy.config()).unwrap();
    let orchestrator = AnalysisOrchestrator::new(Arc::new(client));
    let pair = app.session().images().cloned().unwrap();
    let result = orchestrator.exchange(&pair).await.unwrap();

    assert_eq!(result.name, "Paracetamol");
    assert_eq!(failing.uploads()[0][0].bytes, healthy.uploads()[0][0].bytes);
}

#[tokio::test]
async fn test_custom_identifier_field() {
    let mock = MockIdentificationService::start(
        Reply::Json(json!({ "job_id": 42 })),
        Reply::Json(paracetamol_json()),
    )
    .await;
    let mut config = mock.config();
    config.scan_id_field = "job_id".into();
    let client = HttpIdentificationClient::new(config).unwrap();

    let pair = ImagePair::new(
        medscan::EncodedImage::from_bytes(&jpeg_bytes(7)).unwrap(),
        medscan::EncodedImage::from_bytes(&jpeg_bytes(8)).unwrap(),
    );
    let scan_id = client.submit(&pair).await.unwrap();
    assert_eq!(scan_id, ScanId::new("42"));

    client.fetch_result(&scan_id).await.unwrap();
    assert_eq!(mock.fetched(), vec!["42".to_string()]);
}

#[tokio::test]
async fn test_connection_refused_is_transport_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let config = ServiceConfig::new(
        &format!("http://{addr}/api/upload_images"),
        &format!("http://{addr}/api/get_results/{{scan_id}}"),
    )
    .unwrap();
    let mut app = app_in_review(config).await;

    app.handle(AppEvent::Analyze).await.unwrap();

    assert_eq!(app.screen(), Screen::ImageReview);
    let err = failure(&app);
    assert!(matches!(err, AnalysisError::Transport { .. }));
    assert!(!err.is_contract_violation());
}
