#![allow(dead_code)]

use edit_server::{Config, ServerState, UploadRequest};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use shared::models::ImageRecord;
use std::io::Cursor;
use std::path::Path;
use tempfile::TempDir;

pub struct TestEnv {
    pub dir: TempDir,
    pub state: ServerState,
}

pub async fn setup() -> TestEnv {
    setup_with(|_| {}).await
}

pub async fn setup_with(adjust: impl FnOnce(&mut Config)) -> TestEnv {
    let dir = tempfile::tempdir().unwrap();
    let mut config = Config::with_storage_dir(dir.path());
    config.undo_stack_limit = 10;
    config.retention_enabled = false;
    config.max_upload_size_mb = 20;
    config.thumbnail_size = 300;
    config.thumbnail_quality = 80;
    config.allowed_extensions = ["jpg", "jpeg", "png", "gif", "bmp", "webp", "tiff"]
        .into_iter()
        .map(String::from)
        .collect();
    adjust(&mut config);
    let state = ServerState::initialize(&config).await.unwrap();
    TestEnv { dir, state }
}

pub fn sample(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
    }))
}

pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let mut buf = Vec::new();
    sample(width, height)
        .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .unwrap();
    buf
}

/// JPEG whose APP1 segment carries the given EXIF fields
pub fn jpeg_with_exif(width: u32, height: u32, fields: &[exif::Field]) -> Vec<u8> {
    let mut writer = exif::experimental::Writer::new();
    for field in fields {
        writer.push_field(field);
    }
    let mut tiff = Cursor::new(Vec::new());
    writer.write(&mut tiff, false).unwrap();
    let tiff = tiff.into_inner();

    let mut jpeg = Vec::new();
    sample(width, height)
        .write_to(&mut Cursor::new(&mut jpeg), ImageFormat::Jpeg)
        .unwrap();
    assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);

    let len = u16::try_from(2 + 6 + tiff.len()).unwrap();
    let mut app1 = vec![0xFF, 0xE1];
    app1.extend_from_slice(&len.to_be_bytes());
    app1.extend_from_slice(b"Exif\0\0");
    app1.extend_from_slice(&tiff);
    jpeg.splice(2..2, app1);
    jpeg
}

pub async fn upload_png(state: &ServerState, width: u32, height: u32) -> ImageRecord {
    upload_into(state, width, height, None).await
}

pub async fn upload_into(
    state: &ServerState,
    width: u32,
    height: u32,
    session_id: Option<&str>,
) -> ImageRecord {
    state
        .images
        .upload(UploadRequest {
            filename: "photo.png".into(),
            bytes: png_bytes(width, height),
            session_id: session_id.map(String::from),
            gps: None,
        })
        .await
        .unwrap()
}

pub fn exists(path: &str) -> bool {
    Path::new(path).exists()
}

/// Artifact files (everything except the database) in the storage root
pub fn artifact_count(dir: &Path) -> usize {
    std::fs::read_dir(dir)
        .unwrap()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false))
        .filter(|e| !e.file_name().to_string_lossy().starts_with("imagetools.db"))
        .count()
}
