//! Parsing the model's `config.json` and `preprocessor_config.json`.
//!
//! Both files follow the layout written by Hugging Face `transformers` when a
//! ViT image classifier is saved; only the fields inference needs are read.

use std::collections::HashMap;
use std::path::Path;

use image::imageops::FilterType;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::error::ModelError;

/// The subset of `config.json` used at inference time.
#[derive(Debug, Clone, Deserialize)]
pub struct ClassifierConfig {
    /// Label names keyed by decimal id strings
    pub id2label: HashMap<String, String>,

    /// Declared problem type; multi-label models say `multi_label_classification`
    #[serde(default)]
    pub problem_type: Option<String>,
}

/// Target size for the model input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct InputSize {
    pub height: u32,
    pub width: u32,
}

/// Pixel preprocessing parameters from `preprocessor_config.json`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PreprocessorConfig {
    pub do_resize: bool,
    pub size: InputSize,
    /// PIL resample id (0 nearest, 1 lanczos, 2 bilinear, 3 bicubic)
    pub resample: u32,
    pub do_rescale: bool,
    pub rescale_factor: f32,
    pub do_normalize: bool,
    pub image_mean: [f32; 3],
    pub image_std: [f32; 3],
}

impl Default for PreprocessorConfig {
    fn default() -> Self {
        Self {
            do_resize: true,
            size: InputSize {
                height: 224,
                width: 224,
            },
            resample: 2,
            do_rescale: true,
            rescale_factor: 1.0 / 255.0,
            do_normalize: true,
            image_mean: [0.5, 0.5, 0.5],
            image_std: [0.5, 0.5, 0.5],
        }
    }
}

impl PreprocessorConfig {
    /// Resize filter matching the declared PIL resample mode.
    pub fn filter(&self) -> FilterType {
        match self.resample {
            0 => FilterType::Nearest,
            1 => FilterType::Lanczos3,
            3 => FilterType::CatmullRom,
            _ => FilterType::Triangle,
        }
    }
}

/// Read and deserialize a JSON config file.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, ModelError> {
    if !path.exists() {
        return Err(ModelError::NotFound(path.to_path_buf()));
    }
    let content = std::fs::read_to_string(path).map_err(|e| ModelError::Config {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    serde_json::from_str(&content).map_err(|e| ModelError::Config {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classifier_config_ignores_extra_fields() {
        let json = r#"{
            "architectures": ["ViTForImageClassification"],
            "problem_type": "multi_label_classification",
            "id2label": {"0": "", "1": "cat"},
            "label2id": {"": "0", "cat": "1"},
            "hidden_size": 768
        }"#;
        let config: ClassifierConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.id2label.len(), 2);
        assert_eq!(
            config.problem_type.as_deref(),
            Some("multi_label_classification")
        );
    }

    #[test]
    fn test_preprocessor_defaults_match_vit_base() {
        let config: PreprocessorConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, PreprocessorConfig::default());
        assert_eq!(config.size.width, 224);
        assert_eq!(config.filter(), FilterType::Triangle);
    }

    #[test]
    fn test_preprocessor_overrides() {
        let json = r#"{
            "do_normalize": true,
            "image_mean": [0.485, 0.456, 0.406],
            "image_std": [0.229, 0.224, 0.225],
            "resample": 3,
            "size": {"height": 384, "width": 384},
            "image_processor_type": "ViTImageProcessor"
        }"#;
        let config: PreprocessorConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.size.height, 384);
        assert_eq!(config.filter(), FilterType::CatmullRom);
        assert!((config.image_std[2] - 0.225).abs() < 1e-6);
        assert!(config.do_rescale);
    }

    #[test]
    fn test_read_json_missing() {
        let err = read_json::<ClassifierConfig>(Path::new("/nope/config.json")).unwrap_err();
        assert!(matches!(err, ModelError::NotFound(_)));
    }
}
