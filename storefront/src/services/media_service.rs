// storefront/src/services/media_service.rs

//! Uploaded images: validated, shrunk to fit a per-kind bounding box,
//! re-encoded and written under the media root.

use crate::errors::{AppError, Result};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat};
use std::io::Cursor;
use std::path::PathBuf;
use tracing::{info, instrument, warn};
use uuid::Uuid;

pub const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;
const JPEG_QUALITY: u8 = 85;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
  Product,
  Banner,
}

impl MediaKind {
  /// Bounding box (width, height) the stored image must fit in.
  pub fn bounds(self) -> (u32, u32) {
    match self {
      MediaKind::Product => (800, 800),
      MediaKind::Banner => (1200, 600),
    }
  }

  fn dir(self) -> &'static str {
    match self {
      MediaKind::Product => "products",
      MediaKind::Banner => "banners",
    }
  }
}

/// Shrinks `img` to fit inside `max_w` x `max_h`, keeping the aspect ratio.
/// Images already inside the box are returned untouched.
pub fn fit_within(img: DynamicImage, max_w: u32, max_h: u32) -> DynamicImage {
  if img.width() <= max_w && img.height() <= max_h {
    return img;
  }
  img.resize(max_w, max_h, FilterType::Lanczos3)
}

/// Decodes, resizes and re-encodes an upload. Returns the encoded bytes and
/// the file extension to store them under.
pub fn process_image(bytes: &[u8], kind: MediaKind) -> Result<(Vec<u8>, &'static str)> {
  let format = image::guess_format(bytes)?;
  let ext = match format {
    ImageFormat::Jpeg => "jpg",
    ImageFormat::Png => "png",
    ImageFormat::WebP => "webp",
    other => {
      return Err(AppError::Validation(format!(
        "Unsupported image format {:?}; upload PNG, JPEG or WebP.",
        other
      )))
    }
  };
  let img = image::load_from_memory_with_format(bytes, format)?;
  let (max_w, max_h) = kind.bounds();
  let img = fit_within(img, max_w, max_h);

  let mut out = Cursor::new(Vec::new());
  match format {
    ImageFormat::Jpeg => {
      let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
      rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY))?;
    }
    ImageFormat::WebP => DynamicImage::ImageRgba8(img.to_rgba8()).write_to(&mut out, format)?,
    _ => img.write_to(&mut out, format)?,
  }
  Ok((out.into_inner(), ext))
}

/// Files under `root`, served to clients under `url_prefix`.
#[derive(Debug, Clone)]
pub struct MediaStorage {
  root: PathBuf,
  url_prefix: String,
}

impl MediaStorage {
  pub fn new(root: impl Into<PathBuf>, url_prefix: &str) -> Self {
    Self {
      root: root.into(),
      url_prefix: format!("/{}", url_prefix.trim_matches('/')),
    }
  }

  /// Processes the upload off the async runtime and writes it to disk.
  /// Returns the public URL of the stored file.
  #[instrument(name = "media_service::save_image", skip(self, bytes), fields(size = bytes.len()))]
  pub async fn save_image(&self, kind: MediaKind, bytes: Vec<u8>) -> Result<String> {
    if bytes.len() > MAX_UPLOAD_BYTES {
      return Err(AppError::Validation("Image exceeds the 5 MiB upload limit.".to_string()));
    }
    let (encoded, ext) = tokio::task::spawn_blocking(move || process_image(&bytes, kind))
      .await
      .map_err(|e| AppError::Internal(format!("Image processing task failed: {}", e)))??;

    let file_name = format!("{}.{}", Uuid::new_v4(), ext);
    let dir = self.root.join(kind.dir());
    tokio::fs::create_dir_all(&dir).await?;
    tokio::fs::write(dir.join(&file_name), &encoded).await?;

    let url = format!("{}/{}/{}", self.url_prefix, kind.dir(), file_name);
    info!(%url, bytes = encoded.len(), "Stored uploaded image.");
    Ok(url)
  }

  /// Settles an image swap once the owning record has been written with
  /// `new_url`. On success the previous file is dropped; if the record was
  /// gone (`Ok(false)`) or the write failed, the new file is dropped instead.
  pub async fn finish_replacement(&self, new_url: &str, previous: Option<&str>, attached: Result<bool>) -> Result<bool> {
    match attached {
      Ok(true) => {
        if let Some(previous) = previous {
          self.remove(previous).await;
        }
        Ok(true)
      }
      Ok(false) => {
        warn!(url = %new_url, "Owning record vanished during upload; discarding image.");
        self.remove(new_url).await;
        Ok(false)
      }
      Err(e) => {
        self.remove(new_url).await;
        Err(e)
      }
    }
  }

  /// Deletes a file previously returned by `save_image`. URLs outside the
  /// media prefix are ignored.
  pub async fn remove(&self, url: &str) {
    let Some(relative) = url.strip_prefix(&format!("{}/", self.url_prefix)) else {
      return;
    };
    if relative.split('/').any(|part| part == ".." || part.is_empty()) {
      return;
    }
    if let Err(e) = tokio::fs::remove_file(self.root.join(relative)).await {
      warn!(error = %e, %url, "Could not remove replaced media file.");
    }
  }
}
