//! History Model
//!
//! In memory every operation is an [`Operation`] variant with its own
//! parameter shape. At the storage boundary it becomes an `operation_type`
//! tag plus a JSON `operation_params` blob.

use super::compression::{CompressionPreset, CompressionSettings};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlipDirection {
    Horizontal,
    Vertical,
}

/// A transformation applied to an image
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "params", rename_all = "snake_case")]
pub enum Operation {
    /// Clockwise rotation
    Rotate { degrees: u16 },
    Flip { direction: FlipDirection },
    /// Exact resize, aspect ratio not preserved
    Resize { width: u32, height: u32 },
    Crop {
        x: u32,
        y: u32,
        width: u32,
        height: u32,
    },
    Compress {
        preset: CompressionPreset,
        settings: CompressionSettings,
    },
    BackgroundRemoval { model: String, alpha_matting: bool },
    AiEdit { prompt: String, model: String },
    /// Externally edited image adopted as-is
    Edit { source: String },
}

impl Operation {
    /// Storage tag
    pub fn operation_type(&self) -> &'static str {
        match self {
            Operation::Rotate { .. } => "rotate",
            Operation::Flip { .. } => "flip",
            Operation::Resize { .. } => "resize",
            Operation::Crop { .. } => "crop",
            Operation::Compress { .. } => "compress",
            Operation::BackgroundRemoval { .. } => "background_removal",
            Operation::AiEdit { .. } => "ai_edit",
            Operation::Edit { .. } => "edit",
        }
    }

    /// Middle segment of `{image_id}_{label}_{uuid}{ext}` artifact names
    pub fn artifact_label(&self) -> &'static str {
        match self {
            Operation::Rotate { .. } => "rotated",
            Operation::Flip { .. } => "flipped",
            Operation::Resize { .. } => "resized",
            Operation::Crop { .. } => "cropped",
            Operation::Compress { .. } => "compressed",
            Operation::BackgroundRemoval { .. } => "nobg",
            Operation::AiEdit { .. } => "ai",
            Operation::Edit { .. } => "edited",
        }
    }

    /// Reject parameters no image could satisfy
    pub fn validate(&self) -> Result<(), String> {
        match self {
            Operation::Rotate { degrees } => match degrees {
                90 | 180 | 270 => Ok(()),
                other => Err(format!("Rotation must be 90, 180 or 270 degrees, got {other}")),
            },
            Operation::Flip { .. } => Ok(()),
            Operation::Resize { width, height } => {
                if *width == 0 || *height == 0 {
                    Err("Width and height must be greater than 0".into())
                } else {
                    Ok(())
                }
            }
            Operation::Crop { width, height, .. } => {
                if *width == 0 || *height == 0 {
                    Err("Crop area must be greater than 0".into())
                } else {
                    Ok(())
                }
            }
            Operation::Compress { settings, .. } => settings.validate(),
            Operation::BackgroundRemoval { model, .. } => {
                if model.trim().is_empty() {
                    Err("Background removal model is required".into())
                } else {
                    Ok(())
                }
            }
            Operation::AiEdit { prompt, .. } => {
                if prompt.trim().is_empty() {
                    Err("Prompt must not be empty".into())
                } else {
                    Ok(())
                }
            }
            Operation::Edit { .. } => Ok(()),
        }
    }

    /// Serialized parameter payload
    pub fn params_json(&self) -> serde_json::Result<String> {
        let mut tagged = serde_json::to_value(self)?;
        let params = tagged
            .get_mut("params")
            .map(Value::take)
            .unwrap_or(Value::Null);
        serde_json::to_string(&params)
    }

    /// Rebuild from the stored tag and parameter payload
    pub fn from_stored(operation_type: &str, params: &str) -> serde_json::Result<Self> {
        let params: Value = serde_json::from_str(params)?;
        serde_json::from_value(serde_json::json!({
            "type": operation_type,
            "params": params,
        }))
    }
}

/// One completed operation on an image
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionRecord {
    pub id: i64,
    pub image_id: String,
    #[serde(flatten)]
    pub operation: Operation,
    /// Artifact that was current before this operation
    pub input_path: String,
    /// Artifact this operation produced
    pub output_path: String,
    /// Byte size of `output_path`
    pub file_size: i64,
    pub created_at: i64,
    /// Per-image, contiguous from 1
    pub sequence: i64,
}

/// Append payload for the version log
#[derive(Debug, Clone)]
pub struct VersionCreate {
    pub image_id: String,
    pub operation: Operation,
    pub input_path: String,
    pub output_path: String,
    pub file_size: i64,
}
