//! Error types for the vcardkit codec.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
  #[error("contact has an empty formatted name (FN)")]
  EmptyFormattedName,

  #[error("vCard has no FN property")]
  MissingFormattedName,

  #[error("invalid date in {property}: {value}")]
  InvalidDate { property: String, value: String },

  #[error("invalid GEO value: {0}")]
  InvalidGeo(String),

  #[error("vCard missing BEGIN/END:VCARD envelope")]
  MissingEnvelope,
}

impl Error {
  /// `true` for errors raised while constructing or serializing a contact.
  pub fn is_validation(&self) -> bool {
    matches!(self, Self::EmptyFormattedName)
  }

  /// `true` for errors raised while decoding vCard text.
  pub fn is_decode(&self) -> bool { !self.is_validation() }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
