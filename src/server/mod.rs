use crate::config::ModelConfig;
use crate::torch::ResinModel;
use actix_web::http::header::ContentType;
use actix_web::http::StatusCode;
use actix_web::HttpResponse;
use anyhow::{anyhow, Result};
use once_cell::sync::OnceCell;
use serde_json::json;
use tracing::{error, info};

mod protocol;
pub mod routes;

/// Everything a request handler needs: the model configuration and the model
/// itself, loaded once and shared read-only across requests
pub struct AppState {
    config: ModelConfig,
    model: OnceCell<ResinModel>,
}

impl AppState {
    pub fn new(config: ModelConfig) -> Self {
        AppState {
            config,
            model: OnceCell::new(),
        }
    }

    /// The shared model handle. The first call loads the artifact from disk;
    /// on a load failure the cell stays empty and the next request retries
    pub fn model(&self) -> Result<&ResinModel> {
        self.model.get_or_try_init(|| {
            info!("loading model from {}", self.config.model_path);
            ResinModel::load(&self.config)
        })
    }
}

/// Errors surfaced by the prediction endpoint. A request with no image
/// payload is the caller's fault; everything else that can go wrong in the
/// pipeline is reported as an internal failure
#[derive(Debug)]
pub enum WebError {
    MissingImage,
    Internal(anyhow::Error),
}

impl std::fmt::Display for WebError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WebError::MissingImage => write!(f, "No image data provided"),
            WebError::Internal(err) => write!(f, "{err}"),
        }
    }
}

impl actix_web::error::ResponseError for WebError {
    fn error_response(&self) -> HttpResponse {
        if let WebError::Internal(err) = self {
            error!("inference request failed: {err:#}");
        }

        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .json(json!({ "error": self.to_string() }))
    }

    fn status_code(&self) -> StatusCode {
        match self {
            WebError::MissingImage => StatusCode::BAD_REQUEST,
            WebError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<anyhow::Error> for WebError {
    fn from(err: anyhow::Error) -> WebError {
        WebError::Internal(err)
    }
}

impl From<base64::DecodeError> for WebError {
    fn from(err: base64::DecodeError) -> Self {
        WebError::Internal(anyhow!(err))
    }
}
