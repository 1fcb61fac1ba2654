//! Service configuration. The model settings are fixed at startup and passed
//! into the handler state as one immutable value.

use anyhow::Result;
use config::{Config, Environment, File};
use serde::Deserialize;
use tch::Device;

/// Everything the classifier needs to know about the model artifact and its
/// input format. Defaults match the deployed model; a `resinet.toml` file or
/// `RESINET_*` environment variables can override them.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Path to the serialized model artifact
    pub model_path: String,

    /// Number of output classes the model was trained with
    pub n_classes: i64,

    /// Inputs are resized to `image_size` x `image_size`
    pub image_size: u32,

    /// Per-channel normalization constants, RGB order
    pub mean: [f64; 3],
    pub std: [f64; 3],

    /// Execution device name; anything other than "cuda" runs on CPU
    pub device: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        ModelConfig {
            model_path: "shared/model_fold_0.pth".into(),
            n_classes: 8,
            image_size: 200,
            mean: [0.485, 0.456, 0.406],
            std: [0.229, 0.224, 0.225],
            device: "cpu".into(),
        }
    }
}

impl ModelConfig {
    /// Load the configuration: compiled defaults, then an optional
    /// `resinet.toml`, then `RESINET_*` environment variables.
    pub fn load() -> Result<Self> {
        let settings = Config::builder()
            .add_source(File::with_name("resinet").required(false))
            .add_source(Environment::with_prefix("RESINET"))
            .build()?;
        Ok(settings.try_deserialize()?)
    }

    pub fn device(&self) -> Device {
        match self.device.as_str() {
            "cuda" => Device::cuda_if_available(),
            _ => Device::Cpu,
        }
    }
}
