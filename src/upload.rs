//! Item image ingestion: allow-list, sanitising, downscaling and JPEG
//! re-encoding into the upload directory.

use std::{
    fs::OpenOptions,
    io::{Cursor, ErrorKind, Write},
    path::{Path, PathBuf},
};

use axum::body::Bytes;
use chrono::Local;
use image::{
    DynamicImage, GenericImageView, ImageError, Rgb, RgbImage, codecs::jpeg::JpegEncoder,
    imageops::FilterType,
};
use thiserror::Error;

pub const ALLOWED_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "gif"];
pub const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;
pub const MAX_WIDTH: u32 = 400;
pub const MAX_HEIGHT: u32 = 300;
pub const JPEG_QUALITY: u8 = 75;
const MAX_NAME_ATTEMPTS: u32 = 100;

/// A file field taken from a multipart form.
#[derive(Debug, Clone)]
pub struct Upload {
    pub filename: String,
    pub bytes: Bytes,
}

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("unsupported file extension: {0}")]
    UnsupportedExtension(String),

    #[error("failed to decode image: {0}")]
    Decode(#[source] ImageError),

    #[error("failed to encode image: {0}")]
    Encode(#[source] ImageError),

    #[error("failed to write image: {0}")]
    Io(#[from] std::io::Error),

    #[error("no free file name for {0}")]
    NameTaken(String),

    #[error("image worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

pub fn allowed_file(filename: &str) -> bool {
    filename
        .rsplit_once('.')
        .is_some_and(|(_, ext)| ALLOWED_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
}

/// Reduce an untrusted client filename to a safe, flat name.
pub fn secure_filename(filename: &str) -> String {
    let base = filename.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        .collect();
    cleaned.trim_matches(['.', '_']).to_string()
}

/// Name under which an upload is stored: timestamp prefix, sanitised stem,
/// `.jpg` since the stored bytes are always JPEG.
pub fn stored_filename(original: &str) -> String {
    let safe = secure_filename(original);
    let stem = match safe.rsplit_once('.') {
        Some((stem, _)) => stem,
        None => safe.as_str(),
    };
    let stem = if stem.is_empty() { "image" } else { stem };
    let timestamp = Local::now().format("%Y%m%d_%H%M%S_");
    format!("{timestamp}{stem}.jpg")
}

/// Write `bytes` under `name` in `dir`, or under `<stem>_1.jpg`,
/// `<stem>_2.jpg`, ... when that name is taken. Returns the name used.
pub fn write_unique(dir: &Path, name: &str, bytes: &[u8]) -> Result<String, IngestError> {
    let stem = name.strip_suffix(".jpg").unwrap_or(name);
    for attempt in 0..MAX_NAME_ATTEMPTS {
        let candidate = match attempt {
            0 => name.to_string(),
            n => format!("{stem}_{n}.jpg"),
        };
        let path = dir.join(&candidate);
        let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => file,
            Err(err) if err.kind() == ErrorKind::AlreadyExists => continue,
            Err(err) => return Err(err.into()),
        };
        if let Err(err) = file.write_all(bytes) {
            drop(file);
            let _ = std::fs::remove_file(&path);
            return Err(err.into());
        }
        return Ok(candidate);
    }
    Err(IngestError::NameTaken(name.to_string()))
}

/// Decode, fit within `MAX_WIDTH`×`MAX_HEIGHT`, flatten and encode as JPEG.
pub fn process_image(bytes: &[u8]) -> Result<Vec<u8>, IngestError> {
    let img = image::load_from_memory(bytes).map_err(IngestError::Decode)?;
    let img = fit_within(img, MAX_WIDTH, MAX_HEIGHT);
    let rgb = flatten_onto_white(&img);

    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(rgb)
        .write_with_encoder(JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY))
        .map_err(IngestError::Encode)?;
    Ok(out.into_inner())
}

/// Downscale preserving aspect ratio; smaller images are left alone.
pub fn fit_within(img: DynamicImage, max_width: u32, max_height: u32) -> DynamicImage {
    let (w, h) = img.dimensions();
    if w <= max_width && h <= max_height {
        return img;
    }
    img.resize(max_width, max_height, FilterType::Lanczos3)
}

/// Composite any alpha channel over opaque white.
pub fn flatten_onto_white(img: &DynamicImage) -> RgbImage {
    if !img.color().has_alpha() {
        return img.to_rgb8();
    }
    let rgba = img.to_rgba8();
    let mut out = RgbImage::new(rgba.width(), rgba.height());
    for (x, y, px) in rgba.enumerate_pixels() {
        let [r, g, b, a] = px.0;
        let alpha = u16::from(a);
        let blend = |c: u8| ((u16::from(c) * alpha + 255 * (255 - alpha)) / 255) as u8;
        out.put_pixel(x, y, Rgb([blend(r), blend(g), blend(b)]));
    }
    out
}

/// Local directory holding processed item images.
#[derive(Debug, Clone)]
pub struct ImageStore {
    dir: PathBuf,
}

impl ImageStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_of(&self, filename: &str) -> PathBuf {
        self.dir.join(filename)
    }

    pub async fn ensure_dir(&self) -> std::io::Result<()> {
        tokio::fs::create_dir_all(&self.dir).await
    }

    /// Store an upload and return the generated filename. Any error means no
    /// file was produced; callers treat it as a soft failure. An existing
    /// file is never overwritten.
    pub async fn ingest(&self, upload: &Upload) -> Result<String, IngestError> {
        if !allowed_file(&upload.filename) {
            return Err(IngestError::UnsupportedExtension(upload.filename.clone()));
        }

        let dir = self.dir.clone();
        let name = stored_filename(&upload.filename);
        let bytes = upload.bytes.clone();
        let result = tokio::task::spawn_blocking(move || {
            let encoded = process_image(&bytes)?;
            let filename = write_unique(&dir, &name, &encoded)?;
            Ok::<_, IngestError>((filename, encoded.len()))
        })
        .await
        .map_err(IngestError::from)
        .and_then(|stored| stored);

        match result {
            Ok((filename, size)) => {
                tracing::debug!(file = %filename, bytes = size, "stored item image");
                Ok(filename)
            }
            Err(err) => {
                tracing::error!(error = %err, upload = %upload.filename, "error storing image");
                Err(err)
            }
        }
    }

    /// Best-effort delete of a replaced image.
    pub async fn remove(&self, filename: &str) {
        if secure_filename(filename) != filename {
            tracing::warn!(file = %filename, "refusing to remove unsafe image path");
            return;
        }
        if let Err(err) = tokio::fs::remove_file(self.path_of(filename)).await {
            tracing::debug!(error = %err, file = %filename, "old image not removed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    #[test]
    fn allow_list_is_case_insensitive() {
        assert!(allowed_file("photo.PNG"));
        assert!(allowed_file("photo.JpEg"));
        assert!(allowed_file("archive.tar.gif"));
        assert!(!allowed_file("malware.exe"));
        assert!(!allowed_file("png"));
        assert!(!allowed_file("photo."));
    }

    #[test]
    fn secure_filename_strips_traversal() {
        assert_eq!(secure_filename("../../etc/passwd"), "passwd");
        assert_eq!(secure_filename("C:\\Users\\me\\cat pic.png"), "cat_pic.png");
        assert_eq!(secure_filename("..hidden.jpg"), "hidden.jpg");
        assert_eq!(secure_filename("a<b>|c.gif"), "abc.gif");
    }

    #[test]
    fn stored_filename_has_timestamp_prefix_and_jpg_extension() {
        let name = stored_filename("../My Lamp.PNG");
        assert!(name.ends_with("_My_Lamp.jpg"), "{name}");
        let (date, rest) = name.split_at(8);
        assert!(date.chars().all(|c| c.is_ascii_digit()));
        assert!(rest.starts_with('_'));
        assert_eq!(&rest[7..8], "_");

        assert!(stored_filename("$$$").ends_with("_image.jpg"));
    }

    #[test]
    fn taken_names_get_a_numeric_suffix() {
        let dir = tempfile::tempdir().unwrap();
        let name = "20260101_120000_lamp.jpg";

        assert_eq!(write_unique(dir.path(), name, b"first").unwrap(), name);
        assert_eq!(
            write_unique(dir.path(), name, b"second").unwrap(),
            "20260101_120000_lamp_1.jpg"
        );
        assert_eq!(
            write_unique(dir.path(), name, b"third").unwrap(),
            "20260101_120000_lamp_2.jpg"
        );
        assert_eq!(std::fs::read(dir.path().join(name)).unwrap(), b"first");
    }

    #[test]
    fn small_images_are_not_upscaled() {
        let img = DynamicImage::new_rgb8(40, 30);
        let out = fit_within(img, MAX_WIDTH, MAX_HEIGHT);
        assert_eq!(out.dimensions(), (40, 30));
    }

    #[test]
    fn large_images_fit_the_bounding_box() {
        let out = fit_within(DynamicImage::new_rgb8(1600, 600), MAX_WIDTH, MAX_HEIGHT);
        assert_eq!(out.dimensions(), (400, 150));

        let out = fit_within(DynamicImage::new_rgb8(600, 1200), MAX_WIDTH, MAX_HEIGHT);
        assert_eq!(out.dimensions(), (150, 300));
    }

    #[test]
    fn transparency_becomes_white() {
        let mut rgba = RgbaImage::new(2, 1);
        rgba.put_pixel(0, 0, Rgba([0, 0, 0, 0]));
        rgba.put_pixel(1, 0, Rgba([10, 20, 30, 255]));
        let flat = flatten_onto_white(&DynamicImage::ImageRgba8(rgba));
        assert_eq!(flat.get_pixel(0, 0).0, [255, 255, 255]);
        assert_eq!(flat.get_pixel(1, 0).0, [10, 20, 30]);
    }

    #[test]
    fn garbage_bytes_fail_to_decode() {
        let err = process_image(b"definitely not an image").unwrap_err();
        assert!(matches!(err, IngestError::Decode(_)));
    }
}
