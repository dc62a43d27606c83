//! Decoding and encoding of artifact files

use super::error::{MediaError, MediaResult};
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageDecoder, ImageFormat, ImageReader, Rgb, RgbImage};
use std::io::{BufRead, Cursor, Seek};
use std::path::Path;

/// A decoded image with orientation already applied
pub struct Decoded {
    pub image: DynamicImage,
    pub format: ImageFormat,
    /// Raw EXIF block, when the container carries one
    pub exif: Option<Vec<u8>>,
}

/// Decode a file, applying its EXIF orientation
pub fn open(path: &Path) -> MediaResult<Decoded> {
    let reader = ImageReader::open(path)?.with_guessed_format()?;
    decode_oriented(reader, &path.display().to_string())
}

/// Decode an in-memory upload, applying its EXIF orientation
pub fn decode_bytes(bytes: &[u8]) -> MediaResult<Decoded> {
    let reader = ImageReader::new(Cursor::new(bytes)).with_guessed_format()?;
    decode_oriented(reader, "upload")
}

fn decode_oriented<R: BufRead + Seek>(reader: ImageReader<R>, what: &str) -> MediaResult<Decoded> {
    let format = reader
        .format()
        .ok_or_else(|| MediaError::UnsupportedFormat(what.to_string()))?;
    let mut decoder = reader.into_decoder()?;
    let exif = decoder.exif_metadata().unwrap_or_default();
    let orientation = decoder.orientation()?;
    let mut image = DynamicImage::from_decoder(decoder)?;
    image.apply_orientation(orientation);
    Ok(Decoded {
        image,
        format,
        exif,
    })
}

/// Encode to memory. `quality` only applies to JPEG.
pub fn encode(image: &DynamicImage, format: ImageFormat, quality: u8) -> MediaResult<Vec<u8>> {
    let mut buf = Vec::new();
    match format {
        ImageFormat::Jpeg => {
            let rgb = if image.color().has_alpha() {
                flatten_onto_white(image)
            } else {
                image.to_rgb8()
            };
            let encoder = JpegEncoder::new_with_quality(&mut buf, quality.clamp(1, 100));
            DynamicImage::ImageRgb8(rgb).write_with_encoder(encoder)?;
        }
        ImageFormat::Png
        | ImageFormat::WebP
        | ImageFormat::Gif
        | ImageFormat::Bmp
        | ImageFormat::Tiff => {
            // Every enabled encoder accepts 8-bit RGB / RGBA.
            let normalized = if image.color().has_alpha() {
                DynamicImage::ImageRgba8(image.to_rgba8())
            } else {
                DynamicImage::ImageRgb8(image.to_rgb8())
            };
            normalized.write_to(&mut Cursor::new(&mut buf), format)?;
        }
        other => return Err(MediaError::UnsupportedFormat(format!("{other:?}"))),
    }
    Ok(buf)
}

/// Encode and write, returning the byte size on disk
pub fn save(image: &DynamicImage, path: &Path, format: ImageFormat, quality: u8) -> MediaResult<u64> {
    let bytes = encode(image, format, quality)?;
    std::fs::write(path, &bytes)?;
    Ok(bytes.len() as u64)
}

/// Composite over a white background, dropping alpha
pub fn flatten_onto_white(image: &DynamicImage) -> RgbImage {
    let rgba = image.to_rgba8();
    RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        let p = rgba.get_pixel(x, y);
        let alpha = u32::from(p[3]);
        let blend = |c: u8| ((u32::from(c) * alpha + 255 * (255 - alpha) + 127) / 255) as u8;
        Rgb([blend(p[0]), blend(p[1]), blend(p[2])])
    })
}

/// Format tag stored on image records
pub fn format_tag(format: ImageFormat) -> String {
    match format {
        ImageFormat::Jpeg => "JPEG".into(),
        ImageFormat::Png => "PNG".into(),
        ImageFormat::WebP => "WEBP".into(),
        ImageFormat::Gif => "GIF".into(),
        ImageFormat::Bmp => "BMP".into(),
        ImageFormat::Tiff => "TIFF".into(),
        other => format!("{other:?}").to_ascii_uppercase(),
    }
}

/// Preferred extension (with dot) for a format
pub fn extension_for(format: ImageFormat) -> String {
    match format {
        ImageFormat::Jpeg => ".jpg".into(),
        other => other
            .extensions_str()
            .first()
            .map(|e| format!(".{e}"))
            .unwrap_or_else(|| ".png".into()),
    }
}

/// Encoding format implied by a path's extension
pub fn format_for_path(path: &Path) -> MediaResult<ImageFormat> {
    ImageFormat::from_path(path)
        .map_err(|_| MediaError::UnsupportedFormat(path.display().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    #[test]
    fn test_flatten_onto_white() {
        let mut img = RgbaImage::new(2, 1);
        img.put_pixel(0, 0, Rgba([0, 0, 0, 0]));
        img.put_pixel(1, 0, Rgba([10, 20, 30, 255]));

        let flat = flatten_onto_white(&DynamicImage::ImageRgba8(img));
        assert_eq!(flat.get_pixel(0, 0), &Rgb([255, 255, 255]));
        assert_eq!(flat.get_pixel(1, 0), &Rgb([10, 20, 30]));
    }

    #[test]
    fn test_jpeg_encode_drops_alpha() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(8, 4, Rgba([200, 0, 0, 128])));
        let bytes = encode(&img, ImageFormat::Jpeg, 80).unwrap();

        let decoded = decode_bytes(&bytes).unwrap();
        assert_eq!(decoded.format, ImageFormat::Jpeg);
        assert_eq!((decoded.image.width(), decoded.image.height()), (8, 4));
        assert!(!decoded.image.color().has_alpha());
    }

    #[test]
    fn test_png_keeps_alpha() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(3, 3, Rgba([1, 2, 3, 4])));
        let bytes = encode(&img, ImageFormat::Png, 0).unwrap();
        let decoded = decode_bytes(&bytes).unwrap();
        assert!(decoded.image.color().has_alpha());
    }

    #[test]
    fn test_lower_quality_is_smaller() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_fn(64, 64, |x, y| {
            Rgb([(x * 4) as u8, (y * 4) as u8, ((x ^ y) * 4) as u8])
        }));
        let high = encode(&img, ImageFormat::Jpeg, 95).unwrap();
        let low = encode(&img, ImageFormat::Jpeg, 20).unwrap();
        assert!(low.len() < high.len());
    }

    #[test]
    fn test_tags_and_extensions() {
        assert_eq!(format_tag(ImageFormat::WebP), "WEBP");
        assert_eq!(extension_for(ImageFormat::Jpeg), ".jpg");
        assert_eq!(extension_for(ImageFormat::Png), ".png");
        assert_eq!(
            format_for_path(Path::new("/s/a_thumb.jpeg")).unwrap(),
            ImageFormat::Jpeg
        );
        assert!(format_for_path(Path::new("/s/a_thumb")).is_err());
    }
}
