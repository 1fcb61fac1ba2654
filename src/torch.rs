//! Code for loading and running the trained resin classifier

use crate::config::ModelConfig;
use anyhow::{anyhow, Result};
use image::imageops::FilterType;
use serde::Serialize;
use tch::{no_grad, CModule, Kind, Tensor};

/// Human-readable names for the eight resin categories, indexed by model
/// output position
pub const CLASS_NAMES: [&str; 8] = [
    "1 polyethylene (PET)",
    "2 high density polyethylene (HDPE/PEHD)",
    "3 polyvinyl chloride (PVC)",
    "4 low density polyethylene (LDPE)",
    "5 polypropylene (PP)",
    "6 polystyrene (PS)",
    "7 other resins",
    "8 no plastic",
];

/// A classification produced by the model. `confidence` is the softmax mass
/// on the chosen class, as a percentage
#[derive(Debug, Serialize)]
pub struct Prediction {
    pub prediction: String,
    pub confidence: f64,
}

/// Load and run the serialized classifier
#[derive(Debug)]
pub struct ResinModel {
    /// The loaded torch model
    model: CModule,
    config: ModelConfig,
}

impl ResinModel {
    /// Load the model artifact and switch it to inference mode
    pub fn load(config: &ModelConfig) -> Result<Self> {
        let mut model = CModule::load_on_device(&config.model_path, config.device())?;
        model.set_eval();
        Ok(ResinModel {
            model,
            config: config.clone(),
        })
    }

    /// Classify one image, given its raw (already base64-decoded) bytes
    pub fn predict(&self, image_bytes: &[u8]) -> Result<Prediction> {
        let input = preprocess(image_bytes, &self.config)?;
        let scores = no_grad(|| self.model.forward_ts(&[input]))?;
        classify(&scores, self.config.n_classes)
    }
}

/// Decode raw image bytes into the model's input tensor: force 3-channel RGB,
/// resize square (aspect ratio is not preserved), scale to 0-1, standardize
/// per channel, add the batch dimension
fn preprocess(bytes: &[u8], config: &ModelConfig) -> Result<Tensor> {
    let rgb = image::load_from_memory(bytes)?.to_rgb8();
    let size = config.image_size;
    let resized = image::imageops::resize(&rgb, size, size, FilterType::Triangle);

    let mean = config.mean.map(|m| m as f32);
    let std = config.std.map(|s| s as f32);

    let mut data = Vec::with_capacity(3 * (size * size) as usize);
    for c in 0..3 {
        for pixel in resized.pixels() {
            let v = pixel[c] as f32 / 255.0;
            data.push((v - mean[c]) / std[c]);
        }
    }

    Ok(Tensor::from_slice(&data).view([1, 3, size as i64, size as i64]))
}

/// Softmax the raw scores, pick the arg-max class, and map it through the
/// label table
fn classify(scores: &Tensor, n_classes: i64) -> Result<Prediction> {
    let size = scores.size();
    if size != [1, n_classes] {
        return Err(anyhow!(
            "model produced scores of shape {size:?}, expected [1, {n_classes}]"
        ));
    }

    let probabilities = scores.softmax(1, Some(Kind::Float));
    let index = probabilities.argmax(1, false).int64_value(&[0]);
    let confidence = probabilities.double_value(&[0, index]) * 100.0;

    let label = CLASS_NAMES
        .get(index as usize)
        .ok_or_else(|| anyhow!("class index {index} has no entry in the label table"))?;

    Ok(Prediction {
        prediction: (*label).into(),
        confidence,
    })
}
