//! Wire format of the classification endpoint. The response body is
//! `torch::Prediction`, serialized as-is.

use serde::Deserialize;

/// Body of a classification request: an image, encoded as base 64. The field
/// is optional here so that its absence becomes a validation error instead of
/// a deserialization error
#[derive(Deserialize)]
pub struct PredictRequest {
    #[serde(default)]
    pub image: Option<String>,
}
