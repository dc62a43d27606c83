//! Image Model

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Image record: one per uploaded image
///
/// `current_*` fields always describe the artifact at `current_path`; they
/// change together through a single update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct ImageRecord {
    pub id: String,
    /// Owning editing session, if any
    pub session_id: Option<String>,
    pub original_filename: String,
    /// Byte size of the uploaded file (immutable)
    pub original_size: i64,
    /// Artifact written at ingest (`{id}_original{ext}`)
    pub original_path: String,
    pub current_path: String,
    pub current_size: i64,
    pub width: i64,
    pub height: i64,
    /// Format tag (`JPEG`, `PNG`, `WEBP`, ...)
    pub format: String,
    pub thumbnail_path: Option<String>,
    /// Raw EXIF block captured at upload
    #[serde(skip)]
    pub exif: Option<Vec<u8>>,
    pub gps_latitude: Option<f64>,
    pub gps_longitude: Option<f64>,
    pub gps_altitude: Option<f64>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl ImageRecord {
    /// Snapshot of the current-state register
    pub fn current_state(&self) -> CurrentState {
        CurrentState {
            path: self.current_path.clone(),
            size: self.current_size,
            width: self.width,
            height: self.height,
            format: self.format.clone(),
        }
    }

    pub fn gps(&self) -> Option<GpsPoint> {
        match (self.gps_latitude, self.gps_longitude) {
            (Some(latitude), Some(longitude)) => Some(GpsPoint {
                latitude,
                longitude,
                altitude: self.gps_altitude,
            }),
            _ => None,
        }
    }

    pub fn has_exif(&self) -> bool {
        self.exif.as_ref().is_some_and(|e| !e.is_empty())
    }
}

/// The five fields adopted atomically on every state change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentState {
    pub path: String,
    pub size: i64,
    pub width: i64,
    pub height: i64,
    pub format: String,
}

/// GPS position attached to an upload
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GpsPoint {
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: Option<f64>,
}

/// Camera metadata read from an upload's EXIF block
///
/// `tags` maps EXIF tag names (`Make`, `FNumber`, ...) to display strings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExifSummary {
    pub tags: BTreeMap<String, String>,
    pub gps: Option<GpsPoint>,
}

impl ExifSummary {
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty() && self.gps.is_none()
    }
}

/// Insert payload for a freshly ingested image
#[derive(Debug, Clone)]
pub struct ImageCreate {
    pub id: String,
    pub session_id: Option<String>,
    pub original_filename: String,
    pub original_size: i64,
    pub original_path: String,
    pub state: CurrentState,
    pub thumbnail_path: Option<String>,
    pub exif: Option<Vec<u8>>,
    pub gps: Option<GpsPoint>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> ImageRecord {
        ImageRecord {
            id: "img1".into(),
            session_id: None,
            original_filename: "original.jpg".into(),
            original_size: 1024,
            original_path: "/s/img1_original.jpg".into(),
            current_path: "/s/img1_rotated_x.jpg".into(),
            current_size: 900,
            width: 50,
            height: 100,
            format: "JPEG".into(),
            thumbnail_path: None,
            exif: Some(vec![0x4d, 0x4d]),
            gps_latitude: Some(48.85),
            gps_longitude: None,
            gps_altitude: None,
            created_at: 0,
            updated_at: 0,
        }
    }

    #[test]
    fn test_current_state_snapshot() {
        let state = record().current_state();
        assert_eq!(state.path, "/s/img1_rotated_x.jpg");
        assert_eq!((state.width, state.height), (50, 100));
        assert_eq!(state.format, "JPEG");
    }

    #[test]
    fn test_gps_requires_both_coordinates() {
        let mut r = record();
        assert!(r.gps().is_none());
        r.gps_longitude = Some(2.35);
        let gps = r.gps().unwrap();
        assert_eq!(gps.latitude, 48.85);
        assert!(gps.altitude.is_none());
    }

    #[test]
    fn test_exif_not_serialized() {
        let json = serde_json::to_value(record()).unwrap();
        assert!(json.get("exif").is_none());
        assert_eq!(json["current_size"], 900);
    }
}
