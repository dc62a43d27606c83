//! Compression presets

use serde::{Deserialize, Serialize};

/// Output encoding for a compressed artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OutputFormat {
    Jpeg,
    Png,
    Webp,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Jpeg => ".jpg",
            OutputFormat::Png => ".png",
            OutputFormat::Webp => ".webp",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "JPEG",
            OutputFormat::Png => "PNG",
            OutputFormat::Webp => "WEBP",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompressionPreset {
    Email,
    Web,
    WebHq,
    Custom,
}

impl CompressionPreset {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompressionPreset::Email => "email",
            CompressionPreset::Web => "web",
            CompressionPreset::WebHq => "web_hq",
            CompressionPreset::Custom => "custom",
        }
    }

    /// Built-in settings; `Custom` has none and must carry its own.
    pub fn settings(&self) -> Option<CompressionSettings> {
        match self {
            CompressionPreset::Email => Some(CompressionSettings {
                max_width: 800,
                max_height: 800,
                quality: 85,
                target_size_kb: Some(500),
                format: OutputFormat::Jpeg,
            }),
            CompressionPreset::Web => Some(CompressionSettings {
                max_width: 1920,
                max_height: 1920,
                quality: 90,
                target_size_kb: Some(500),
                format: OutputFormat::Jpeg,
            }),
            CompressionPreset::WebHq => Some(CompressionSettings {
                max_width: 2560,
                max_height: 2560,
                quality: 95,
                target_size_kb: Some(1000),
                format: OutputFormat::Webp,
            }),
            CompressionPreset::Custom => None,
        }
    }
}

/// Resolved compression parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompressionSettings {
    pub max_width: u32,
    pub max_height: u32,
    /// JPEG quality, 1..=100
    pub quality: u8,
    pub target_size_kb: Option<u32>,
    pub format: OutputFormat,
}

impl CompressionSettings {
    pub fn validate(&self) -> Result<(), String> {
        if self.max_width == 0 || self.max_height == 0 {
            return Err("Compression bounds must be greater than 0".into());
        }
        if !(1..=100).contains(&self.quality) {
            return Err(format!("Quality must be between 1 and 100, got {}", self.quality));
        }
        if self.target_size_kb == Some(0) {
            return Err("Target size must be greater than 0".into());
        }
        Ok(())
    }
}
