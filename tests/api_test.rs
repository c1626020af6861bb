mod common;

use actix_web::http::{StatusCode, header};
use actix_web::{App, test, web};
use common::{BOUNDARY, Part, StubClassifier, app_state, multipart_body, png};
use mineral_id::Method;
use mineral_id::classifier::InferenceError;
use mineral_id::protocol::{ErrorResponse, HealthResponse, PredictResponse, RootResponse};
use mineral_id::server::{AppState, configure};

macro_rules! app {
    ($state:expr) => {
        test::init_service(
            App::new()
                .app_data(web::Data::new($state))
                .configure(configure),
        )
        .await
    };
}

fn multipart_request(parts: &[Part<'_>]) -> test::TestRequest {
    multipart_post("/predict", parts)
}

fn multipart_post(uri: &str, parts: &[Part<'_>]) -> test::TestRequest {
    test::TestRequest::post()
        .uri(uri)
        .insert_header((
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        ))
        .set_payload(multipart_body(parts))
}

fn simple_request(hardness: &str, density: &str) -> test::TestRequest {
    test::TestRequest::post()
        .uri("/predict_simple")
        .set_form([("durete", hardness), ("densite", density)])
}

fn degraded() -> AppState {
    app_state(None)
}

#[actix_web::test]
async fn test_root() {
    let app = app!(degraded());
    let req = test::TestRequest::get().uri("/").to_request();
    let body: RootResponse = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body.message, "Mineral prediction API");
    assert_eq!(body.version, env!("CARGO_PKG_VERSION"));
}

#[actix_web::test]
async fn test_health_reports_model_status() {
    let app = app!(degraded());
    let req = test::TestRequest::get().uri("/health").to_request();
    let body: HealthResponse = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body.status, "ok");
    assert_eq!(body.model_status, "unavailable");

    let app = app!(app_state(Some(StubClassifier(Ok(vec![1.0])))));
    let req = test::TestRequest::get().uri("/health").to_request();
    let body: HealthResponse = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body.model_status, "loaded");
}

#[actix_web::test]
async fn test_predict_simple_rule_table() {
    let app = app!(degraded());
    let cases = [
        ("7.0", "3.5", "Diamant", 95.0),
        ("6.0", "2.6", "Quartz", 88.0),
        ("5.0", "2.5", "Feldspath", 85.0),
        ("4.0", "2.2", "Calcite", 82.0),
        ("3.0", "2.0", "Gypse", 78.0),
        ("1.0", "1.0", "Minéral commun", 70.0),
    ];
    for (hardness, density, label, confidence) in cases {
        let req = simple_request(hardness, density).to_request();
        let body: PredictResponse = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body.predicted_mineral, label);
        assert_eq!(body.confidence, confidence);
        assert_eq!(body.method, Method::RuleBased);
    }
}

#[actix_web::test]
async fn test_predict_simple_english_field_names() {
    let app = app!(degraded());
    let req = test::TestRequest::post()
        .uri("/predict_simple")
        .set_form([("hardness", "6.0"), ("density", "2.6")])
        .to_request();
    let body: PredictResponse = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body.predicted_mineral, "Quartz");
}

#[actix_web::test]
async fn test_predict_simple_multipart() {
    let app = app!(degraded());
    let req = multipart_post(
        "/predict_simple",
        &[Part::Text("durete", "7.0"), Part::Text("densite", "3.5")],
    )
    .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: PredictResponse = test::read_body_json(resp).await;
    assert_eq!(body.predicted_mineral, "Diamant");
    assert_eq!(body.confidence, 95.0);
    assert_eq!(body.method, Method::RuleBased);
}

#[actix_web::test]
async fn test_predict_simple_multipart_ignores_image() {
    let app = app!(app_state(Some(StubClassifier(Ok(vec![0.0, 0.0, 0.0, 0.0, 1.0])))));
    let image = png(16, 16);
    let req = multipart_post(
        "/predict_simple",
        &[
            Part::File("image", "sample.png", &image),
            Part::Text("hardness", "6.0"),
            Part::Text("density", "2.6"),
        ],
    )
    .to_request();
    let body: PredictResponse = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body.predicted_mineral, "Quartz");
    assert_eq!(body.method, Method::RuleBased);
}

#[actix_web::test]
async fn test_repeated_field_keeps_last_value_in_both_encodings() {
    let app = app!(degraded());
    let req = test::TestRequest::post()
        .uri("/predict_simple")
        .set_form([("hardness", "2"), ("durete", "7.0"), ("densite", "3.5")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let urlencoded: PredictResponse = test::read_body_json(resp).await;

    let req = multipart_post(
        "/predict_simple",
        &[
            Part::Text("hardness", "2"),
            Part::Text("durete", "7.0"),
            Part::Text("densite", "3.5"),
        ],
    )
    .to_request();
    let multipart: PredictResponse = test::call_and_read_body_json(&app, req).await;

    assert_eq!(urlencoded.predicted_mineral, "Diamant");
    assert_eq!(urlencoded, multipart);
}

#[actix_web::test]
async fn test_predict_simple_ignores_loaded_model() {
    let app = app!(app_state(Some(StubClassifier(Ok(vec![0.0, 0.0, 0.0, 0.0, 1.0])))));
    let req = simple_request("7", "3.5").to_request();
    let body: PredictResponse = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body.predicted_mineral, "Diamant");
    assert_eq!(body.method, Method::RuleBased);
}

#[actix_web::test]
async fn test_out_of_range_rejected() {
    let app = app!(degraded());
    let hardness = (
        "hardness must be between 0 and 10",
        "Dureté doit être entre 0 et 10",
    );
    let density = (
        "density must be between 0 and 20",
        "Densité doit être entre 0 et 20",
    );
    let cases = [
        ("-1", "3.5", hardness),
        ("11", "3.5", hardness),
        ("7.0", "-1", density),
        ("7.0", "21", density),
    ];
    for (h, d, (english, french)) in cases {
        let req = simple_request(h, d).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: ErrorResponse = test::read_body_json(resp).await;
        assert!(body.detail.contains(english), "{}", body.detail);
        assert!(body.detail.contains(french), "{}", body.detail);
    }
}

#[actix_web::test]
async fn test_non_numeric_field_rejected() {
    let app = app!(degraded());
    let resp = test::call_service(&app, simple_request("seven", "3.5").to_request()).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: ErrorResponse = test::read_body_json(resp).await;
    assert!(body.detail.contains("hardness must be a number"));
}

#[actix_web::test]
async fn test_predict_degraded_with_image() {
    let app = app!(degraded());
    let image = png(640, 480);
    let req = multipart_request(&[
        Part::File("image", "sample.png", &image),
        Part::Text("durete", "7.0"),
        Part::Text("densite", "3.5"),
    ])
    .to_request();
    let body: PredictResponse = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body.predicted_mineral, "Diamant");
    assert_eq!(body.confidence, 95.0);
    assert_eq!(body.method, Method::RuleBased);
}

#[actix_web::test]
async fn test_predict_learned() {
    let probabilities = vec![0.0625, 0.0625, 0.0625, 0.0625, 0.75];
    let app = app!(app_state(Some(StubClassifier(Ok(probabilities)))));
    let image = png(100, 300);
    let req = multipart_request(&[
        Part::Text("hardness", "7.0"),
        Part::Text("density", "3.5"),
        Part::File("image", "sample.png", &image),
    ])
    .to_request();
    let body: PredictResponse = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body.predicted_mineral, "Quartz");
    assert_eq!(body.confidence, 75.0);
    assert_eq!(body.method, Method::Learned);
}

#[actix_web::test]
async fn test_predict_unscaled_model_output_falls_back() {
    let scores = vec![0.1, 2.5, 0.3, -1.0, 0.0];
    let app = app!(app_state(Some(StubClassifier(Ok(scores)))));
    let image = png(32, 32);
    let req = multipart_request(&[
        Part::File("image", "sample.png", &image),
        Part::Text("durete", "7.0"),
        Part::Text("densite", "3.5"),
    ])
    .to_request();
    let body: PredictResponse = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body.predicted_mineral, "Diamant");
    assert_eq!(body.confidence, 95.0);
    assert_eq!(body.method, Method::RuleBased);
}

#[actix_web::test]
async fn test_predict_inference_failure_falls_back() {
    let err = InferenceError::Backend("runtime exploded".to_string());
    let app = app!(app_state(Some(StubClassifier(Err(err)))));
    let image = png(32, 32);
    let req = multipart_request(&[
        Part::File("image", "sample.png", &image),
        Part::Text("durete", "6.0"),
        Part::Text("densite", "2.6"),
    ])
    .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: PredictResponse = test::read_body_json(resp).await;
    assert_eq!(body.predicted_mineral, "Quartz");
    assert_eq!(body.method, Method::RuleBased);
}

#[actix_web::test]
async fn test_predict_identical_requests() {
    let app = app!(app_state(Some(StubClassifier(Ok(vec![0.5, 0.25, 0.25])))));
    let image = png(77, 55);
    let parts = [
        Part::File("image", "sample.png", &image),
        Part::Text("durete", "5.5"),
        Part::Text("densite", "2.65"),
    ];
    let first: PredictResponse =
        test::call_and_read_body_json(&app, multipart_request(&parts).to_request()).await;
    let second: PredictResponse =
        test::call_and_read_body_json(&app, multipart_request(&parts).to_request()).await;
    assert_eq!(first, second);
    assert_eq!(first.predicted_mineral, "Calcite");
}

#[actix_web::test]
async fn test_predict_corrupt_image() {
    let app = app!(degraded());
    let req = multipart_request(&[
        Part::File("image", "broken.jpg", b"\xff\xd8\xff not really a jpeg"),
        Part::Text("durete", "7.0"),
        Part::Text("densite", "3.5"),
    ])
    .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: ErrorResponse = test::read_body_json(resp).await;
    assert!(body.detail.starts_with("could not decode image"));
}

#[actix_web::test]
async fn test_predict_without_anything() {
    let app = app!(degraded());
    let req = multipart_request(&[Part::Text("note", "no measurements")]).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: ErrorResponse = test::read_body_json(resp).await;
    assert_eq!(body.detail, "missing required field: hardness");
}

#[actix_web::test]
async fn test_predict_without_image_uses_rules() {
    let app = app!(app_state(Some(StubClassifier(Ok(vec![1.0])))));
    let req = multipart_request(&[Part::Text("durete", "4.0"), Part::Text("densite", "2.2")])
        .to_request();
    let body: PredictResponse = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body.predicted_mineral, "Calcite");
    assert_eq!(body.method, Method::RuleBased);
}

#[actix_web::test]
async fn test_predict_image_too_large() {
    let app = app!(degraded());
    let oversized = vec![0u8; 2 * 1024 * 1024];
    let req = multipart_request(&[
        Part::File("image", "huge.png", &oversized),
        Part::Text("durete", "7.0"),
        Part::Text("densite", "3.5"),
    ])
    .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: ErrorResponse = test::read_body_json(resp).await;
    assert!(body.detail.contains("upload limit"));
}
