//! Photo embedding.
//!
//! Image decoding and resizing live outside the codec. A [`PhotoResolver`]
//! turns a [`Photo::Source`] into JPEG bytes; this module only base64-encodes
//! the result so the serializer can write it verbatim.

use std::path::Path;

use base64::{Engine as _, engine::general_purpose::STANDARD as B64};

use crate::contact::{Contact, Photo};

/// Largest edge, in pixels, a resolver should produce by default.
pub const DEFAULT_MAX_DIMENSION: u32 = 300;

/// Produces JPEG bytes for a photo source.
///
/// Implementations are expected to bound the image to a maximum pixel
/// dimension (see [`DEFAULT_MAX_DIMENSION`]).
pub trait PhotoResolver {
  type Error: std::error::Error + Send + Sync + 'static;

  fn resolve(&self, source: &Path) -> Result<Vec<u8>, Self::Error>;
}

/// Base64-encode JPEG bytes into the payload form stored in
/// [`Photo::Encoded`].
pub fn encode_photo(bytes: &[u8]) -> String { B64.encode(bytes) }

impl Contact {
  /// Replace a [`Photo::Source`] with its encoded payload. Does nothing when
  /// the photo is absent or already encoded.
  pub fn resolve_photo<R>(&mut self, resolver: &R) -> Result<(), R::Error>
  where
    R: PhotoResolver + ?Sized,
  {
    if let Some(Photo::Source(path)) = &self.photo {
      let bytes = resolver.resolve(path)?;
      tracing::debug!(path = %path.display(), bytes = bytes.len(), "embedded photo");
      self.photo = Some(Photo::Encoded(encode_photo(&bytes)));
    }
    Ok(())
  }
}
