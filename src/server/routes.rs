//! The user-facing JSON endpoint that serves classification requests

use super::protocol::PredictRequest;
use super::{AppState, WebError};
use actix_web::{post, web, Responder};
use anyhow::anyhow;
use base64::{engine::general_purpose, Engine as _};
use tracing::info;

type Result<T> = std::result::Result<T, WebError>;

/// Classify one plastic-waste photo. Body: `{"image": "<base64>"}`.
/// Responds `{"prediction": <label>, "confidence": <percentage>}`.
#[post("/api/predict")]
pub async fn predict(body: web::Bytes, state: web::Data<AppState>) -> Result<impl Responder> {
    info!("processing classification request");

    // A body that is not JSON at all counts as a pipeline failure, not a
    // client validation error
    let request: PredictRequest =
        serde_json::from_slice(&body).map_err(|err| WebError::Internal(anyhow!(err)))?;

    let encoded = request.image.unwrap_or_default();
    if encoded.is_empty() {
        return Err(WebError::MissingImage);
    }

    let image = general_purpose::STANDARD.decode(encoded)?;

    // tch inference is synchronous; keep it off the async executor
    let state = state.clone();
    let prediction = web::block(move || state.model()?.predict(&image))
        .await
        .map_err(|err| WebError::Internal(anyhow!(err)))??;

    info!(
        label = prediction.prediction.as_str(),
        confidence = prediction.confidence,
        "finished serving classification request"
    );

    Ok(web::Json(prediction))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ModelConfig;
    use crate::torch::CLASS_NAMES;
    use actix_web::http::StatusCode;
    use actix_web::{test, App};
    use image::{DynamicImage, ImageOutputFormat, Rgb, RgbImage};
    use serde_json::{json, Value};
    use std::io::Cursor;

    async fn post(body: impl Into<Vec<u8>>) -> (StatusCode, Value) {
        let state = web::Data::new(AppState::new(ModelConfig::default()));
        let app = test::init_service(App::new().app_data(state).service(predict)).await;
        let req = test::TestRequest::post()
            .uri("/api/predict")
            .insert_header(("content-type", "application/json"))
            .set_payload(body.into())
            .to_request();
        let resp = test::call_service(&app, req).await;
        let status = resp.status();
        let body: Value = test::read_body_json(resp).await;
        (status, body)
    }

    fn white_png_b64() -> String {
        let img = RgbImage::from_pixel(500, 500, Rgb([255, 255, 255]));
        let mut bytes = Vec::new();
        DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut bytes), ImageOutputFormat::Png)
            .unwrap();
        general_purpose::STANDARD.encode(bytes)
    }

    #[actix_web::test]
    async fn missing_image_field_is_a_400() {
        let (status, body) = post("{}").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "error": "No image data provided" }));
    }

    #[actix_web::test]
    async fn empty_image_field_is_a_400() {
        let (status, body) = post(r#"{"image": ""}"#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "error": "No image data provided" }));
    }

    #[actix_web::test]
    async fn malformed_json_is_a_500() {
        let (status, body) = post("this is not json").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!body["error"].as_str().unwrap().is_empty());
    }

    #[actix_web::test]
    async fn invalid_base64_is_a_500() {
        let (status, body) = post(r#"{"image": "not-base64!!"}"#).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!body["error"].as_str().unwrap().is_empty());
    }

    #[actix_web::test]
    async fn valid_base64_of_garbage_is_a_500() {
        let payload = json!({ "image": general_purpose::STANDARD.encode(b"not an image") });
        let (status, body) = post(payload.to_string()).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!body["error"].as_str().unwrap().is_empty());
    }

    // Needs the deployed weight artifact at shared/model_fold_0.pth
    #[actix_web::test]
    #[ignore]
    async fn white_square_classifies() {
        let payload = json!({ "image": white_png_b64() }).to_string();
        let (status, body) = post(payload).await;
        assert_eq!(status, StatusCode::OK);
        assert!(CLASS_NAMES.contains(&body["prediction"].as_str().unwrap()));
        let confidence = body["confidence"].as_f64().unwrap();
        assert!((0.0..=100.0).contains(&confidence));
    }

    // Needs the deployed weight artifact at shared/model_fold_0.pth
    #[actix_web::test]
    #[ignore]
    async fn identical_payloads_get_identical_predictions() {
        let payload = json!({ "image": white_png_b64() }).to_string();
        let (status_a, body_a) = post(payload.clone()).await;
        let (status_b, body_b) = post(payload).await;
        assert_eq!(status_a, StatusCode::OK);
        assert_eq!(status_b, StatusCode::OK);
        assert_eq!(body_a, body_b);
    }
}
