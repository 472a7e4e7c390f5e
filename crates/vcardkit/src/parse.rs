//! vCard 4.0 content-line parser.
//!
//! Pipeline:
//!   raw &str
//!     └─ split_lines() + unfold()  → Vec<String>
//!          └─ parse_content_line()  → ContentLine
//!               └─ ContactBuilder::apply() → accumulate fields
//!                    └─ ContactBuilder::finish() → Contact

use std::collections::BTreeMap;

use chrono::NaiveDate;
use strum::EnumString;

use crate::{
  contact::{
    Address, Contact, CustomValue, Geo, Photo, StructuredName, Typed,
  },
  error::{Error, Result},
  text::{caret_decode, split_lines, split_unescaped, unescape, unfold},
};

// ─── Property names ──────────────────────────────────────────────────────────

/// Every property the decoder maps onto a contact field. Anything else lands
/// in [`PropertyName::Other`] and from there in the custom bucket.
#[derive(Debug, Clone, PartialEq, Eq, EnumString)]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
enum PropertyName {
  Begin,
  End,
  Version,
  #[strum(serialize = "FN")]
  FormattedName,
  #[strum(serialize = "N")]
  Name,
  Nickname,
  Photo,
  Bday,
  Anniversary,
  Gender,
  Email,
  Tel,
  Adr,
  Org,
  Title,
  Role,
  Url,
  Impp,
  Uid,
  Prodid,
  Rev,
  Tz,
  Geo,
  Categories,
  Note,
  #[strum(serialize = "X-SOCIALPROFILE")]
  SocialProfile,
  #[strum(default)]
  Other(String),
}

// ─── Content-line representation ─────────────────────────────────────────────

struct ContentLine {
  /// Upper-cased property name as written.
  name:   String,
  kind:   PropertyName,
  params: Vec<Param>,
  /// Raw value, still escaped.
  value:  String,
}

struct Param {
  /// Lower-cased parameter name.
  name:   String,
  values: Vec<String>,
}

impl ContentLine {
  /// All `TYPE` values, across repeated `TYPE=` parameters.
  fn types(&self) -> Vec<String> {
    self
      .params
      .iter()
      .filter(|p| p.name == "type")
      .flat_map(|p| p.values.iter().cloned())
      .collect()
  }

  fn has_param(&self, name: &str) -> bool {
    self.params.iter().any(|p| p.name == name)
  }
}

// ─── Low-level helpers ───────────────────────────────────────────────────────

/// Find the first `:` that is not inside a double-quoted string.
fn find_unquoted_colon(s: &str) -> Option<usize> {
  let mut in_quotes = false;
  for (i, c) in s.char_indices() {
    match c {
      '"' => in_quotes = !in_quotes,
      ':' if !in_quotes => return Some(i),
      _ => {}
    }
  }
  None
}

/// Split on `sep` while respecting double-quoted strings.
fn split_respecting_quotes(s: &str, sep: char) -> Vec<&str> {
  let mut result = Vec::new();
  let mut start = 0usize;
  let mut in_quotes = false;
  for (i, c) in s.char_indices() {
    if c == '"' {
      in_quotes = !in_quotes;
    } else if c == sep && !in_quotes {
      result.push(&s[start..i]);
      start = i + c.len_utf8();
    }
  }
  result.push(&s[start..]);
  result
}

/// Split a raw value on unescaped `sep` and unescape each component.
fn components(raw: &str, sep: char) -> Vec<String> {
  split_unescaped(raw, sep).into_iter().map(unescape).collect()
}

/// Map a raw value onto the custom bucket's representation: structured when
/// it holds an unescaped `;`, scalar otherwise.
fn custom_value(raw: &str) -> CustomValue {
  let parts = split_unescaped(raw, ';');
  if parts.len() > 1 {
    CustomValue::List(parts.into_iter().map(unescape).collect())
  } else {
    CustomValue::Scalar(unescape(raw))
  }
}

/// Parse `YYYY-MM-DD` or `YYYYMMDD`.
fn parse_date(property: &str, value: &str) -> Result<NaiveDate> {
  let trimmed = value.trim();
  NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
    .or_else(|_| NaiveDate::parse_from_str(trimmed, "%Y%m%d"))
    .map_err(|_| Error::InvalidDate {
      property: property.to_string(),
      value:    value.to_string(),
    })
}

/// Parse `lat;lon`, or an RFC 6350 `geo:lat,lon[,alt][;params]` URI.
fn parse_geo(raw: &str) -> Result<Geo> {
  let invalid = || Error::InvalidGeo(raw.to_string());
  let value = raw.trim();

  let uri = value
    .get(..4)
    .filter(|scheme| scheme.eq_ignore_ascii_case("geo:"))
    .map(|_| &value[4..]);
  let parts: Vec<&str> = match uri {
    Some(rest) => {
      let coords: Vec<&str> =
        rest.split(';').next().unwrap_or_default().split(',').collect();
      if coords.len() == 3 { coords[..2].to_vec() } else { coords }
    }
    None => split_unescaped(value, ';'),
  };

  let &[lat, lon] = parts.as_slice() else {
    return Err(invalid());
  };
  // `inf` and `NaN` are accepted so the serializer's own output always
  // decodes.
  let coord = |s: &str| s.trim().parse::<f64>().map_err(|_| invalid());
  Ok(Geo {
    latitude:  coord(lat)?,
    longitude: coord(lon)?,
  })
}

// ─── Content-line parser ─────────────────────────────────────────────────────

/// Split a logical line into name, parameters and raw value. Returns `None`
/// for lines without a colon or without a property name.
fn parse_content_line(line: &str) -> Option<ContentLine> {
  let colon_pos = find_unquoted_colon(line)?;

  let key_part = &line[..colon_pos];
  let value = line[colon_pos + 1..].to_string();

  let tokens = split_respecting_quotes(key_part, ';');
  let name = tokens[0].trim().to_ascii_uppercase();
  if name.is_empty() {
    return None;
  }
  // Group prefix ("ITEM1.EMAIL") is ignored for dispatch but kept in `name`
  // for the custom bucket.
  let base = name.rsplit_once('.').map_or(name.as_str(), |(_, b)| b);
  let kind = base
    .parse::<PropertyName>()
    .unwrap_or_else(|_| PropertyName::Other(base.to_string()));

  let mut params: Vec<Param> = Vec::new();
  for token in &tokens[1..] {
    let (param_name, raw_values) = match token.split_once('=') {
      Some((k, v)) => (k.trim().to_ascii_lowercase(), v),
      // Bare token: vCard 3.0 shorthand for TYPE=token
      None if !token.trim().is_empty() => ("type".to_string(), token.trim()),
      None => continue,
    };
    let values: Vec<String> = split_respecting_quotes(raw_values, ',')
      .into_iter()
      .map(|v| caret_decode(v.trim_matches('"')))
      .collect();

    match params.iter_mut().find(|p| p.name == param_name) {
      Some(existing) => existing.values.extend(values),
      None => params.push(Param {
        name: param_name,
        values,
      }),
    }
  }

  Some(ContentLine {
    name,
    kind,
    params,
    value,
  })
}

// ─── Accumulator ─────────────────────────────────────────────────────────────

/// Collects decoded fields. Only [`ContactBuilder::finish`] produces a
/// [`Contact`], and only once a formatted name has been seen.
#[derive(Default)]
struct ContactBuilder {
  formatted_name:  Option<String>,
  name:            Option<StructuredName>,
  nicknames:       Vec<String>,
  photo:           Option<Photo>,
  birthday:        Option<NaiveDate>,
  anniversary:     Option<NaiveDate>,
  gender:          Option<String>,
  emails:          Vec<Typed<String>>,
  phones:          Vec<Typed<String>>,
  addresses:       Vec<Typed<Address>>,
  org:             Option<Vec<String>>,
  title:           Option<String>,
  role:            Option<String>,
  urls:            Vec<String>,
  impps:           Vec<String>,
  uid:             Option<String>,
  prodid:          Option<String>,
  rev:             Option<String>,
  tz:              Option<String>,
  geo:             Option<Geo>,
  categories:      Vec<String>,
  note:            Option<String>,
  custom:          BTreeMap<String, Vec<CustomValue>>,
  social_profiles: Vec<Typed<String>>,
}

/// Fill a single-valued slot from the first occurrence of its property.
/// Later occurrences are kept verbatim in the custom bucket.
fn first_or_custom<T, F>(
  slot: &mut Option<T>,
  custom: &mut BTreeMap<String, Vec<CustomValue>>,
  cl: &ContentLine,
  decode: F,
) -> Result<()>
where
  F: FnOnce(&str) -> Result<T>,
{
  if slot.is_some() {
    push_custom(custom, cl);
  } else {
    *slot = Some(decode(&cl.value)?);
  }
  Ok(())
}

fn push_custom(custom: &mut BTreeMap<String, Vec<CustomValue>>, cl: &ContentLine) {
  custom
    .entry(cl.name.clone())
    .or_default()
    .push(custom_value(&cl.value));
}

fn text(raw: &str) -> Result<String> { Ok(unescape(raw)) }

impl ContactBuilder {
  fn apply(&mut self, cl: &ContentLine) -> Result<()> {
    match &cl.kind {
      PropertyName::Begin | PropertyName::End | PropertyName::Version => {}

      // ── Identity ──────────────────────────────────────────────────────────
      PropertyName::FormattedName => {
        first_or_custom(&mut self.formatted_name, &mut self.custom, cl, text)?
      }
      PropertyName::Name => {
        first_or_custom(&mut self.name, &mut self.custom, cl, |raw| {
          Ok(StructuredName::from_components(components(raw, ';')))
        })?
      }
      PropertyName::Nickname => self.nicknames.extend(components(&cl.value, ';')),
      PropertyName::Photo => {
        if !cl.has_param("encoding") {
          tracing::debug!("ignoring PHOTO without ENCODING parameter");
        } else if self.photo.is_some() {
          tracing::debug!("ignoring additional PHOTO");
        } else {
          self.photo = Some(Photo::Encoded(cl.value.trim().to_string()));
        }
      }
      PropertyName::Bday => {
        first_or_custom(&mut self.birthday, &mut self.custom, cl, |raw| {
          parse_date("BDAY", raw)
        })?
      }
      PropertyName::Anniversary => {
        first_or_custom(&mut self.anniversary, &mut self.custom, cl, |raw| {
          parse_date("ANNIVERSARY", raw)
        })?
      }
      PropertyName::Gender => {
        first_or_custom(&mut self.gender, &mut self.custom, cl, text)?
      }

      // ── Contact methods ───────────────────────────────────────────────────
      PropertyName::Email => self.emails.push(Typed {
        value: unescape(&cl.value),
        types: cl.types(),
      }),
      PropertyName::Tel => self.phones.push(Typed {
        value: unescape(&cl.value),
        types: cl.types(),
      }),
      PropertyName::Adr => self.addresses.push(Typed {
        value: Address::from_components(components(&cl.value, ';')),
        types: cl.types(),
      }),
      PropertyName::Url => self.urls.push(unescape(&cl.value)),
      PropertyName::Impp => self.impps.push(unescape(&cl.value)),
      PropertyName::SocialProfile => self.social_profiles.push(Typed {
        value: unescape(&cl.value),
        types: cl.types(),
      }),

      // ── Organization ──────────────────────────────────────────────────────
      PropertyName::Org => {
        first_or_custom(&mut self.org, &mut self.custom, cl, |raw| {
          Ok(components(raw, ';'))
        })?
      }
      PropertyName::Title => {
        first_or_custom(&mut self.title, &mut self.custom, cl, text)?
      }
      PropertyName::Role => {
        first_or_custom(&mut self.role, &mut self.custom, cl, text)?
      }

      // ── Misc ──────────────────────────────────────────────────────────────
      PropertyName::Uid => first_or_custom(&mut self.uid, &mut self.custom, cl, text)?,
      PropertyName::Prodid => {
        first_or_custom(&mut self.prodid, &mut self.custom, cl, text)?
      }
      PropertyName::Rev => first_or_custom(&mut self.rev, &mut self.custom, cl, text)?,
      PropertyName::Tz => first_or_custom(&mut self.tz, &mut self.custom, cl, text)?,
      PropertyName::Geo => {
        first_or_custom(&mut self.geo, &mut self.custom, cl, parse_geo)?
      }
      PropertyName::Categories => {
        self.categories.extend(components(&cl.value, ','))
      }
      PropertyName::Note => {
        first_or_custom(&mut self.note, &mut self.custom, cl, text)?
      }

      // ── Everything else → custom ──────────────────────────────────────────
      PropertyName::Other(_) => push_custom(&mut self.custom, cl),
    }
    Ok(())
  }

  fn finish(self) -> Result<Contact> {
    let formatted_name = self
      .formatted_name
      .filter(|n| !n.is_empty())
      .ok_or(Error::MissingFormattedName)?;

    Ok(Contact {
      formatted_name,
      name: self.name,
      nicknames: self.nicknames,
      photo: self.photo,
      birthday: self.birthday,
      anniversary: self.anniversary,
      gender: self.gender,
      emails: self.emails,
      phones: self.phones,
      addresses: self.addresses,
      org: self.org,
      title: self.title,
      role: self.role,
      urls: self.urls,
      impps: self.impps,
      uid: self.uid,
      prodid: self.prodid,
      rev: self.rev,
      tz: self.tz,
      geo: self.geo,
      categories: self.categories,
      note: self.note,
      custom: self.custom,
      social_profiles: self.social_profiles,
    })
  }
}

// ─── Core parser ─────────────────────────────────────────────────────────────

/// Decode already-unfolded logical lines into one contact.
pub(crate) fn decode_lines(lines: &[String]) -> Result<Contact> {
  let mut builder = ContactBuilder::default();
  for line in lines {
    match parse_content_line(line) {
      Some(cl) => builder.apply(&cl)?,
      None if line.trim().is_empty() => {}
      None => tracing::debug!(line = %line, "skipping malformed content line"),
    }
  }
  builder.finish()
}

/// Split and unfold raw vCard text into logical lines.
pub(crate) fn logical_lines(input: &str) -> Vec<String> {
  unfold(split_lines(input))
}

/// Decode a single contact from `input`.
pub(crate) fn decode(input: &str) -> Result<Contact> {
  decode_lines(&logical_lines(input))
}

// ─── Tests ───────────────────────────────────────────────────────────────────
