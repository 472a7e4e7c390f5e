//! vCard 4.0 (RFC 6350) codec.
//!
//! Converts between [`Contact`] records and vCard text. Pure and synchronous:
//! the codec never touches the filesystem or the network.
//!
//! # Quick start
//!
//! ```no_run
//! use vcardkit::{Contact, Typed, from_text, to_text};
//!
//! let mut alice = Contact::new("Alice Smith").unwrap();
//! alice.emails.push(Typed::with_types("alice@example.com".to_string(), ["work"]));
//!
//! let vcard = to_text(&alice).unwrap();
//! assert_eq!(from_text(&vcard).unwrap(), alice);
//! ```

pub mod contact;
pub mod error;
mod parse;
pub mod photo;
mod serialize;
pub mod text;

pub use contact::{
  Address, Contact, CustomValue, Geo, Photo, StructuredName, Typed,
};
pub use error::{Error, Result};
pub use photo::{PhotoResolver, encode_photo};
pub use serialize::{EncodeOptions, to_text, to_text_many, to_text_with};

// ─── Public API ──────────────────────────────────────────────────────────────

/// Decode a single contact from `input`.
///
/// The `BEGIN`/`END` envelope is optional. Lines without a colon and
/// continuation lines with nothing to continue are skipped. Fails when FN is
/// missing, or when BDAY, ANNIVERSARY or GEO cannot be parsed.
pub fn from_text(input: &str) -> Result<Contact> { parse::decode(input) }

/// Decode zero or more contacts from `input`.
///
/// Each `BEGIN:VCARD … END:VCARD` block is decoded independently; a malformed
/// block yields `Err(…)` in the corresponding position without aborting the
/// rest.
pub fn from_text_many(input: &str) -> Vec<Result<Contact>> {
  let lines = parse::logical_lines(input);
  let mut results = Vec::new();
  let mut i = 0;

  while i < lines.len() {
    if lines[i].eq_ignore_ascii_case("BEGIN:VCARD") {
      let start = i;
      let rel_end = lines[start + 1..]
        .iter()
        .position(|l| l.eq_ignore_ascii_case("END:VCARD"));

      if let Some(offset) = rel_end {
        let end = start + 1 + offset;
        results.push(parse::decode_lines(&lines[start..=end]));
        i = end + 1;
      } else {
        results.push(Err(Error::MissingEnvelope));
        break;
      }
    } else {
      i += 1;
    }
  }

  results
}

// ─── Round-trip test ─────────────────────────────────────────────────────────
