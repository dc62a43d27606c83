mod common;

use common::{
    artifact_count, exists, jpeg_with_exif, png_bytes, setup, setup_with, upload_into, upload_png,
};
use exif::{Field, In, Rational, Tag, Value};
use edit_server::{HistoryError, ImageServiceError, UploadRequest};
use shared::error::{AppError, ErrorCode};
use shared::models::{CompressionPreset, CompressionSettings, GpsPoint, Operation, OutputFormat};

fn request(filename: &str, bytes: Vec<u8>) -> UploadRequest {
    UploadRequest {
        filename: filename.into(),
        bytes,
        session_id: None,
        gps: None,
    }
}

#[tokio::test]
async fn test_upload_creates_original_and_thumbnail() {
    let env = setup().await;
    let img = env
        .state
        .images
        .upload(UploadRequest {
            filename: "Holiday.PNG".into(),
            bytes: png_bytes(64, 32),
            session_id: Some("s1".into()),
            gps: Some(GpsPoint {
                latitude: 48.85,
                longitude: 2.35,
                altitude: None,
            }),
        })
        .await
        .unwrap();

    assert_eq!(img.original_filename, "Holiday.PNG");
    assert!(img.original_path.ends_with(&format!("{}_original.png", img.id)));
    assert_eq!(img.current_path, img.original_path);
    assert_eq!(img.current_size, img.original_size);
    assert_eq!(
        img.original_size as u64,
        std::fs::metadata(&img.original_path).unwrap().len()
    );
    assert_eq!((img.width, img.height), (64, 32));
    assert_eq!(img.format, "PNG");
    assert_eq!(img.session_id.as_deref(), Some("s1"));
    assert_eq!(img.gps().unwrap().longitude, 2.35);

    let thumb = img.thumbnail_path.unwrap();
    assert!(thumb.ends_with(&format!("{}_thumb.png", img.id)));
    assert!(exists(&thumb));
}

fn exif_field(tag: Tag, value: Value) -> Field {
    Field {
        tag,
        ifd_num: In::PRIMARY,
        value,
    }
}

fn degrees(whole: u32) -> Value {
    Value::Rational(vec![
        Rational { num: whole, denom: 1 },
        Rational { num: 30, denom: 1 },
        Rational { num: 0, denom: 1 },
    ])
}

fn camera_jpeg() -> Vec<u8> {
    jpeg_with_exif(
        40,
        30,
        &[
            exif_field(Tag::Make, Value::Ascii(vec![b"Nikon".to_vec()])),
            exif_field(Tag::GPSLatitudeRef, Value::Ascii(vec![b"N".to_vec()])),
            exif_field(Tag::GPSLatitude, degrees(48)),
            exif_field(Tag::GPSLongitudeRef, Value::Ascii(vec![b"W".to_vec()])),
            exif_field(Tag::GPSLongitude, degrees(2)),
            exif_field(Tag::GPSAltitudeRef, Value::Byte(vec![0])),
            exif_field(
                Tag::GPSAltitude,
                Value::Rational(vec![Rational { num: 35, denom: 1 }]),
            ),
        ],
    )
}

#[tokio::test]
async fn test_upload_reads_gps_from_exif() {
    let env = setup().await;
    let images = &env.state.images;

    let img = images.upload(request("camera.jpg", camera_jpeg())).await.unwrap();
    assert_eq!(img.format, "JPEG");
    assert!(img.has_exif());
    let gps = img.gps().unwrap();
    assert!((gps.latitude - 48.5).abs() < 1e-9);
    assert!((gps.longitude + 2.5).abs() < 1e-9);
    assert_eq!(gps.altitude, Some(35.0));

    let summary = images.exif_summary(&img.id).await.unwrap().unwrap();
    assert_eq!(summary.tags.get("Make").map(String::as_str), Some("Nikon"));
    assert_eq!(summary.gps, Some(gps));

    // Caller-supplied GPS takes precedence.
    let explicit = GpsPoint {
        latitude: 1.0,
        longitude: 2.0,
        altitude: None,
    };
    let img = images
        .upload(UploadRequest {
            gps: Some(explicit),
            ..request("camera.jpg", camera_jpeg())
        })
        .await
        .unwrap();
    assert_eq!(img.gps(), Some(explicit));

    // No EXIF at all.
    let plain = upload_png(&env.state, 10, 10).await;
    assert!(plain.gps().is_none());
    assert!(images.exif_summary(&plain.id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_upload_validation() {
    let env = setup_with(|c| c.max_upload_size_mb = 0).await;
    let images = &env.state.images;

    let err = images
        .upload(request("virus.exe", vec![1, 2, 3]))
        .await
        .unwrap_err();
    assert!(matches!(err, ImageServiceError::UnsupportedFileType(_)));

    let err = images.upload(request("empty.png", Vec::new())).await.unwrap_err();
    assert!(matches!(err, ImageServiceError::EmptyFile));

    let err = images
        .upload(request("big.png", png_bytes(4, 4)))
        .await
        .unwrap_err();
    assert!(matches!(err, ImageServiceError::FileTooLarge { limit: 0, .. }));
    let app: AppError = err.into();
    assert_eq!(app.code, ErrorCode::FileTooLarge);
}

#[tokio::test]
async fn test_upload_of_undecodable_bytes_leaves_nothing_behind() {
    let env = setup().await;
    let err = env
        .state
        .images
        .upload(request("broken.png", b"definitely not a png".to_vec()))
        .await
        .unwrap_err();
    assert!(matches!(err, ImageServiceError::Media(_)));
    assert_eq!(artifact_count(env.dir.path()), 0);
}

#[tokio::test]
async fn test_compress_with_preset() {
    let env = setup().await;
    let img = upload_png(&env.state, 1000, 500).await;

    let record = env
        .state
        .images
        .compress(&img.id, CompressionPreset::Email, None)
        .await
        .unwrap();
    assert!(record.output_path.ends_with(".jpg"));
    assert!(record.output_path.contains("_compressed_"));
    assert!(record.file_size <= 500 * 1024);
    match &record.operation {
        Operation::Compress { preset, settings } => {
            assert_eq!(*preset, CompressionPreset::Email);
            assert_eq!(settings.max_width, 800);
        }
        other => panic!("unexpected operation {other:?}"),
    }

    let current = env.state.history.get_image(&img.id).await.unwrap();
    assert_eq!((current.width, current.height), (800, 400));
    assert_eq!(current.format, "JPEG");

    // Undo returns to the PNG original.
    env.state.history.undo(&img.id).await.unwrap();
    let current = env.state.history.get_image(&img.id).await.unwrap();
    assert_eq!(current.format, "PNG");
    assert_eq!((current.width, current.height), (1000, 500));
}

#[tokio::test]
async fn test_compress_custom_requires_settings() {
    let env = setup().await;
    let img = upload_png(&env.state, 50, 50).await;
    let images = &env.state.images;

    let err = images
        .compress(&img.id, CompressionPreset::Custom, None)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ImageServiceError::History(HistoryError::InvalidOperation(_))
    ));

    let settings = CompressionSettings {
        max_width: 20,
        max_height: 20,
        quality: 70,
        target_size_kb: None,
        format: OutputFormat::Png,
    };
    let record = images
        .compress(&img.id, CompressionPreset::Custom, Some(settings))
        .await
        .unwrap();
    assert!(record.output_path.ends_with(".png"));
    let current = env.state.history.get_image(&img.id).await.unwrap();
    assert_eq!((current.width, current.height), (20, 20));
}

#[tokio::test]
async fn test_save_edited_adopts_new_version() {
    let env = setup().await;
    let img = upload_png(&env.state, 40, 40).await;

    let record = env
        .state
        .images
        .save_edited(&img.id, png_bytes(10, 12))
        .await
        .unwrap();
    assert_eq!(
        record.operation,
        Operation::Edit {
            source: "advanced_editor".into()
        }
    );
    assert_eq!(record.input_path, img.original_path);

    let current = env.state.history.get_image(&img.id).await.unwrap();
    assert_eq!((current.width, current.height), (10, 12));

    let err = env
        .state
        .images
        .save_edited(&img.id, b"garbage".to_vec())
        .await
        .unwrap_err();
    assert!(matches!(err, ImageServiceError::History(_)));
    assert_eq!(env.state.history.get_history(&img.id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_delete_image_removes_everything() {
    let env = setup().await;
    let img = upload_png(&env.state, 30, 30).await;
    let images = &env.state.images;
    images.rotate(&img.id, 90).await.unwrap();
    images.rotate(&img.id, 90).await.unwrap();
    env.state.history.restore_to_sequence(&img.id, 1).await.unwrap();

    let other = upload_png(&env.state, 10, 10).await;
    let files_before = artifact_count(env.dir.path());

    let removed = images.delete_image(&img.id).await.unwrap();
    // original + two outputs + thumbnail
    assert_eq!(removed, 4);
    assert_eq!(artifact_count(env.dir.path()), files_before - 4);

    assert!(matches!(
        images.get_image(&img.id).await,
        Err(ImageServiceError::History(HistoryError::ImageNotFound(_)))
    ));
    assert!(matches!(
        env.state.history.get_history(&img.id).await,
        Err(HistoryError::ImageNotFound(_))
    ));
    assert!(exists(&other.original_path));
}

#[tokio::test]
async fn test_delete_session_images() {
    let env = setup().await;
    let a = upload_into(&env.state, 10, 10, Some("s1")).await;
    upload_into(&env.state, 10, 10, Some("s1")).await;
    let kept = upload_into(&env.state, 10, 10, Some("s2")).await;
    env.state.images.rotate(&a.id, 90).await.unwrap();

    let images = &env.state.images;
    assert_eq!(images.list_session_images("s1").await.unwrap().len(), 2);
    assert_eq!(images.delete_session_images("s1").await.unwrap(), 2);
    assert!(images.list_session_images("s1").await.unwrap().is_empty());

    let remaining = images.list_session_images("s2").await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id, kept.id);
    assert!(exists(&kept.original_path));
}
