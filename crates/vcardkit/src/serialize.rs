//! vCard 4.0 serializer.
//!
//! Produces CRLF line endings and folds each content line with
//! [`text::fold`](crate::text::fold).

use serde::{Deserialize, Serialize};

use crate::{
  contact::{Contact, CustomValue, Photo, Typed},
  error::Result,
  text::{DEFAULT_FOLD_LIMIT, caret_encode, escape, fold},
};

/// Knobs for [`to_text_with`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodeOptions {
  /// Maximum physical line length in octets, continuation space included.
  pub fold_limit: usize,
}

impl Default for EncodeOptions {
  fn default() -> Self {
    Self {
      fold_limit: DEFAULT_FOLD_LIMIT,
    }
  }
}

// ─── Line assembly ────────────────────────────────────────────────────────────

/// Accumulates folded physical lines.
struct Lines {
  limit: usize,
  out:   String,
}

impl Lines {
  fn new(limit: usize) -> Self {
    Self {
      limit,
      out: String::new(),
    }
  }

  /// Emit `name[params]:value` as one logical line.
  fn push(&mut self, name: &str, params: &str, value: &str) {
    let line = format!("{name}{params}:{value}");
    for segment in fold(&line, self.limit) {
      self.out.push_str(&segment);
      self.out.push_str("\r\n");
    }
  }

  fn finish(self) -> String { self.out }
}

// ─── Value helpers ────────────────────────────────────────────────────────────

/// Escape every component and join with `sep`.
fn join_escaped<'a, I>(parts: I, sep: &str) -> String
where
  I: IntoIterator<Item = &'a str>,
{
  parts.into_iter().map(escape).collect::<Vec<_>>().join(sep)
}

fn strings(parts: &[String]) -> impl Iterator<Item = &str> {
  parts.iter().map(String::as_str)
}

/// `;TYPE=a,b` or nothing when `types` is empty.
fn type_param(types: &[String]) -> String {
  if types.is_empty() {
    return String::new();
  }
  let values: Vec<String> = types.iter().map(|t| quote_param(t)).collect();
  format!(";TYPE={}", values.join(","))
}

/// Caret-encode a parameter value, then double-quote it if it contains a
/// delimiter.
fn quote_param(value: &str) -> String {
  let encoded = caret_encode(value);
  if encoded.contains([',', ';', ':']) {
    format!("\"{encoded}\"")
  } else {
    encoded
  }
}

/// Whether `name` can be written as a property name: letters, digits and `-`,
/// with an optional `group.` prefix. Envelope names are refused so custom data
/// cannot open or close a card.
fn is_writable_name(name: &str) -> bool {
  let base = name.rsplit_once('.').map_or(name, |(_, b)| b);
  let well_formed = name.split('.').all(|part| {
    !part.is_empty() && part.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
  });
  let reserved = ["BEGIN", "END", "VERSION"]
    .iter()
    .any(|r| base.eq_ignore_ascii_case(r));
  well_formed && !reserved
}

fn format_date(d: chrono::NaiveDate) -> String {
  d.format("%Y-%m-%d").to_string()
}

fn push_typed(lines: &mut Lines, name: &str, entries: &[Typed<String>]) {
  for entry in entries {
    lines.push(name, &type_param(&entry.types), &escape(&entry.value));
  }
}

fn push_scalar(lines: &mut Lines, name: &str, value: Option<&String>) {
  if let Some(v) = value {
    lines.push(name, "", &escape(v));
  }
}

fn custom_value(value: &CustomValue) -> String {
  match value {
    CustomValue::Scalar(s) => escape(s),
    CustomValue::List(parts) => join_escaped(strings(parts), ";"),
  }
}

// ─── Public API ───────────────────────────────────────────────────────────────

/// Serialize `contact` as a vCard 4.0 string with default options.
pub fn to_text(contact: &Contact) -> Result<String> {
  to_text_with(contact, &EncodeOptions::default())
}

/// Serialize several contacts back to back.
pub fn to_text_many(contacts: &[Contact]) -> Result<String> {
  let options = EncodeOptions::default();
  contacts
    .iter()
    .map(|c| to_text_with(c, &options))
    .collect::<Result<Vec<_>>>()
    .map(|cards| cards.concat())
}

/// Serialize `contact` as a vCard 4.0 string.
///
/// Fails only when the formatted name is empty; nothing is produced in that
/// case.
pub fn to_text_with(contact: &Contact, options: &EncodeOptions) -> Result<String> {
  contact.validate()?;

  let mut lines = Lines::new(options.fold_limit);
  lines.push("BEGIN", "", "VCARD");
  lines.push("VERSION", "", "4.0");

  lines.push("FN", "", &escape(&contact.formatted_name));
  if let Some(ref n) = contact.name {
    lines.push("N", "", &join_escaped(n.components(), ";"));
  }
  if !contact.nicknames.is_empty() {
    lines.push("NICKNAME", "", &join_escaped(strings(&contact.nicknames), ";"));
  }

  match contact.photo {
    Some(Photo::Encoded(ref data)) => {
      lines.push("PHOTO", ";ENCODING=b;MEDIATYPE=image/jpeg", data);
    }
    Some(Photo::Source(ref path)) => {
      tracing::warn!(
        path = %path.display(),
        "photo source was not resolved before encoding; PHOTO omitted"
      );
    }
    None => {}
  }

  if let Some(d) = contact.birthday {
    lines.push("BDAY", "", &format_date(d));
  }
  if let Some(d) = contact.anniversary {
    lines.push("ANNIVERSARY", "", &format_date(d));
  }
  push_scalar(&mut lines, "GENDER", contact.gender.as_ref());

  push_typed(&mut lines, "EMAIL", &contact.emails);
  push_typed(&mut lines, "TEL", &contact.phones);
  for adr in &contact.addresses {
    lines.push(
      "ADR",
      &type_param(&adr.types),
      &join_escaped(adr.value.components(), ";"),
    );
  }

  if let Some(ref org) = contact.org {
    lines.push("ORG", "", &join_escaped(strings(org), ";"));
  }
  push_scalar(&mut lines, "TITLE", contact.title.as_ref());
  push_scalar(&mut lines, "ROLE", contact.role.as_ref());

  for url in &contact.urls {
    lines.push("URL", "", &escape(url));
  }
  for impp in &contact.impps {
    lines.push("IMPP", "", &escape(impp));
  }

  push_scalar(&mut lines, "UID", contact.uid.as_ref());
  push_scalar(&mut lines, "PRODID", contact.prodid.as_ref());
  push_scalar(&mut lines, "REV", contact.rev.as_ref());
  push_scalar(&mut lines, "TZ", contact.tz.as_ref());
  if let Some(geo) = contact.geo {
    lines.push("GEO", "", &format!("{};{}", geo.latitude, geo.longitude));
  }
  if !contact.categories.is_empty() {
    lines.push("CATEGORIES", "", &join_escaped(strings(&contact.categories), ","));
  }
  push_scalar(&mut lines, "NOTE", contact.note.as_ref());

  for (name, values) in &contact.custom {
    if !is_writable_name(name) {
      tracing::warn!(name = %name, "skipping custom property with unwritable name");
      continue;
    }
    let name = name.to_ascii_uppercase();
    for value in values {
      lines.push(&name, "", &custom_value(value));
    }
  }

  push_typed(&mut lines, "X-SOCIALPROFILE", &contact.social_profiles);

  lines.push("END", "", "VCARD");
  Ok(lines.finish())
}

// ─── Tests ───────────────────────────────────────────────────────────────────
