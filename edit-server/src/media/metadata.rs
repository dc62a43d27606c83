//! EXIF metadata
//!
//! Parses the raw EXIF block captured by the decoder into display strings
//! for a fixed set of camera tags and a decimal-degree GPS position.

use exif::{Exif, In, Reader, Tag, Value};
use shared::models::{ExifSummary, GpsPoint};

/// APP1 identifier some containers leave in front of the TIFF header
const EXIF_PREFIX: &[u8] = b"Exif\0\0";

/// Tags copied into [`ExifSummary::tags`]
const CAMERA_TAGS: &[Tag] = &[
    Tag::Make,
    Tag::Model,
    Tag::DateTime,
    Tag::DateTimeOriginal,
    Tag::ExposureTime,
    Tag::FNumber,
    Tag::PhotographicSensitivity,
    Tag::FocalLength,
    Tag::Flash,
    Tag::WhiteBalance,
    Tag::Software,
    Tag::Orientation,
    Tag::XResolution,
    Tag::YResolution,
];

/// Parse a raw EXIF block. Returns `None` when the block is unreadable.
pub fn parse(raw: &[u8]) -> Option<ExifSummary> {
    let tiff = raw.strip_prefix(EXIF_PREFIX).unwrap_or(raw);
    let exif = match Reader::new().read_raw(tiff.to_vec()) {
        Ok(exif) => exif,
        Err(e) => {
            tracing::debug!(error = %e, "Unreadable EXIF block");
            return None;
        }
    };

    let tags = CAMERA_TAGS
        .iter()
        .filter_map(|tag| {
            let field = exif.get_field(*tag, In::PRIMARY)?;
            let text = match &field.value {
                Value::Ascii(parts) => ascii_text(parts)?,
                _ => field.display_value().with_unit(&exif).to_string(),
            };
            Some((tag.to_string(), text))
        })
        .collect();

    Some(ExifSummary {
        tags,
        gps: gps_point(&exif),
    })
}

/// Latitude and longitude are required; altitude is optional.
fn gps_point(exif: &Exif) -> Option<GpsPoint> {
    let latitude = coordinate(exif, Tag::GPSLatitude, Tag::GPSLatitudeRef, b'S')?;
    let longitude = coordinate(exif, Tag::GPSLongitude, Tag::GPSLongitudeRef, b'W')?;
    Some(GpsPoint {
        latitude,
        longitude,
        altitude: altitude(exif),
    })
}

fn coordinate(exif: &Exif, tag: Tag, ref_tag: Tag, negative: u8) -> Option<f64> {
    let Value::Rational(dms) = &exif.get_field(tag, In::PRIMARY)?.value else {
        return None;
    };
    let Value::Ascii(reference) = &exif.get_field(ref_tag, In::PRIMARY)?.value else {
        return None;
    };
    if dms.len() < 3 {
        return None;
    }

    let part = |i: usize| {
        let r = dms[i];
        if r.denom == 0 {
            f64::from(r.num)
        } else {
            r.to_f64()
        }
    };
    let degrees = part(0) + part(1) / 60.0 + part(2) / 3600.0;

    let is_negative = reference
        .first()
        .and_then(|r| r.first())
        .is_some_and(|c| c.eq_ignore_ascii_case(&negative));
    Some(if is_negative { -degrees } else { degrees })
}

/// Metres; `GPSAltitudeRef` 1 means below sea level
fn altitude(exif: &Exif) -> Option<f64> {
    let Value::Rational(values) = &exif.get_field(Tag::GPSAltitude, In::PRIMARY)?.value else {
        return None;
    };
    let value = values.first().filter(|r| r.denom != 0)?.to_f64();
    let below = exif
        .get_field(Tag::GPSAltitudeRef, In::PRIMARY)
        .and_then(|f| f.value.get_uint(0))
        == Some(1);
    Some(if below { -value } else { value })
}

fn ascii_text(parts: &[Vec<u8>]) -> Option<String> {
    let text = String::from_utf8_lossy(parts.first()?);
    let text = text.trim_end_matches('\0').trim();
    (!text.is_empty()).then(|| text.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use exif::experimental::Writer;
    use exif::{Field, Rational};
    use std::io::Cursor;

    fn field(tag: Tag, value: Value) -> Field {
        Field {
            tag,
            ifd_num: In::PRIMARY,
            value,
        }
    }

    fn dms(d: u32, m: u32, s_hundredths: u32) -> Value {
        Value::Rational(vec![
            Rational { num: d, denom: 1 },
            Rational { num: m, denom: 1 },
            Rational {
                num: s_hundredths,
                denom: 100,
            },
        ])
    }

    fn ascii(text: &str) -> Value {
        Value::Ascii(vec![text.as_bytes().to_vec()])
    }

    fn tiff(fields: &[Field]) -> Vec<u8> {
        let mut writer = Writer::new();
        for f in fields {
            writer.push_field(f);
        }
        let mut buf = Cursor::new(Vec::new());
        writer.write(&mut buf, false).unwrap();
        buf.into_inner()
    }

    #[test]
    fn test_parse_camera_tags_and_gps() {
        let raw = tiff(&[
            field(Tag::Make, ascii("Canon")),
            field(Tag::Model, ascii("EOS 5D")),
            field(Tag::GPSLatitudeRef, ascii("S")),
            field(Tag::GPSLatitude, dms(33, 51, 3600)),
            field(Tag::GPSLongitudeRef, ascii("E")),
            field(Tag::GPSLongitude, dms(151, 12, 0)),
            field(Tag::GPSAltitudeRef, Value::Byte(vec![1])),
            field(
                Tag::GPSAltitude,
                Value::Rational(vec![Rational { num: 25, denom: 2 }]),
            ),
        ]);

        let summary = parse(&raw).unwrap();
        assert_eq!(summary.tags.get("Make").map(String::as_str), Some("Canon"));
        assert_eq!(summary.tags.get("Model").map(String::as_str), Some("EOS 5D"));

        let gps = summary.gps.unwrap();
        assert!((gps.latitude + (33.0 + 51.0 / 60.0 + 36.0 / 3600.0)).abs() < 1e-9);
        assert!((gps.longitude - 151.2).abs() < 1e-9);
        assert_eq!(gps.altitude, Some(-12.5));
    }

    #[test]
    fn test_parse_accepts_app1_prefix() {
        let mut raw = EXIF_PREFIX.to_vec();
        raw.extend(tiff(&[field(Tag::Software, ascii("edit"))]));
        let summary = parse(&raw).unwrap();
        assert_eq!(summary.tags.get("Software").map(String::as_str), Some("edit"));
        assert!(summary.gps.is_none());
    }

    #[test]
    fn test_gps_needs_both_coordinates() {
        let raw = tiff(&[
            field(Tag::GPSLatitudeRef, ascii("N")),
            field(Tag::GPSLatitude, dms(10, 0, 0)),
        ]);
        assert!(parse(&raw).unwrap().gps.is_none());
    }

    #[test]
    fn test_garbage_is_none() {
        assert!(parse(b"not exif at all").is_none());
        assert!(parse(&[]).is_none());
    }
}
