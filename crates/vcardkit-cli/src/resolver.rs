//! Photo resolver backed by the local filesystem.

use std::{io::Cursor, path::Path};

use image::{DynamicImage, ImageError, ImageFormat};
use vcardkit::{PhotoResolver, photo::DEFAULT_MAX_DIMENSION};

/// Loads any image format the `image` crate can read, shrinks it to fit
/// within `max_dimension` on both edges (aspect ratio kept, never enlarged)
/// and re-encodes it as JPEG.
pub struct FileResolver {
  pub max_dimension: u32,
}

impl Default for FileResolver {
  fn default() -> Self {
    Self {
      max_dimension: DEFAULT_MAX_DIMENSION,
    }
  }
}

impl PhotoResolver for FileResolver {
  type Error = ImageError;

  fn resolve(&self, source: &Path) -> Result<Vec<u8>, ImageError> {
    let img = image::open(source)?;
    let (width, height) = (img.width(), img.height());

    let img = if width.max(height) > self.max_dimension {
      img.thumbnail(self.max_dimension, self.max_dimension)
    } else {
      img
    };

    // JPEG has no alpha channel.
    let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
    let mut out = Cursor::new(Vec::new());
    rgb.write_to(&mut out, ImageFormat::Jpeg)?;

    tracing::debug!(
      path = %source.display(),
      from = ?(width, height),
      to = ?(rgb.width(), rgb.height()),
      "resized photo",
    );
    Ok(out.into_inner())
  }
}

#[cfg(test)]
mod tests {
  use image::{Rgba, RgbaImage};

  use super::*;

  fn decoded(bytes: &[u8]) -> DynamicImage {
    assert_eq!(image::guess_format(bytes).unwrap(), ImageFormat::Jpeg);
    image::load_from_memory_with_format(bytes, ImageFormat::Jpeg).unwrap()
  }

  #[test]
  fn png_is_reencoded_as_jpeg() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("face.png");
    RgbaImage::from_pixel(40, 20, Rgba([10, 200, 30, 128]))
      .save(&path)
      .unwrap();

    let img = decoded(&FileResolver::default().resolve(&path).unwrap());
    assert_eq!((img.width(), img.height()), (40, 20));
  }

  #[test]
  fn oversize_image_is_shrunk_to_fit() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("big.png");
    RgbaImage::new(900, 600).save(&path).unwrap();

    let img = decoded(&FileResolver::default().resolve(&path).unwrap());
    assert_eq!((img.width(), img.height()), (300, 200));
  }

  #[test]
  fn custom_bound_is_honoured() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tall.png");
    RgbaImage::new(50, 200).save(&path).unwrap();

    let resolver = FileResolver { max_dimension: 100 };
    let img = decoded(&resolver.resolve(&path).unwrap());
    assert_eq!((img.width(), img.height()), (25, 100));
  }

  #[test]
  fn unreadable_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("note.png");
    std::fs::write(&path, b"not an image").unwrap();
    assert!(FileResolver::default().resolve(&path).is_err());
  }

  #[test]
  fn missing_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = FileResolver::default()
      .resolve(&dir.path().join("absent.jpg"))
      .unwrap_err();
    assert!(matches!(err, ImageError::IoError(_)));
  }
}
