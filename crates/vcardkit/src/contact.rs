//! The contact record — the typed side of the codec.
//!
//! Fields are public and mutated by ordinary assignment. The one invariant,
//! a non-empty formatted name, is checked by [`Contact::new`] and again at
//! serialization time.

use std::{collections::BTreeMap, path::PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};

// ─── Structured values ───────────────────────────────────────────────────────

/// A structured name (vCard `N`): five ordered components, each possibly
/// empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StructuredName {
  pub family:     String,
  pub given:      String,
  pub additional: String,
  /// Honorific prefixes, e.g. "Dr.".
  pub prefixes:   String,
  /// Honorific suffixes, e.g. "Jr.".
  pub suffixes:   String,
}

impl StructuredName {
  /// Build from wire components. Missing trailing components are empty;
  /// surplus components are appended to `suffixes`.
  pub fn from_components<I>(parts: I) -> Self
  where
    I: IntoIterator<Item = String>,
  {
    let [family, given, additional, prefixes, suffixes] =
      fixed_components(parts);
    Self { family, given, additional, prefixes, suffixes }
  }

  /// Components in wire order.
  pub fn components(&self) -> [&str; 5] {
    [
      &self.family,
      &self.given,
      &self.additional,
      &self.prefixes,
      &self.suffixes,
    ]
  }
}

/// A postal address (vCard `ADR`): always exactly seven components.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Address {
  pub po_box:      String,
  /// Apartment or suite.
  pub extended:    String,
  pub street:      String,
  /// City or locality.
  pub locality:    String,
  /// State, province, or region.
  pub region:      String,
  pub postal_code: String,
  pub country:     String,
}

impl Address {
  /// Build from wire components. Fewer than seven are padded with empty
  /// strings; surplus components are appended to `country`.
  pub fn from_components<I>(parts: I) -> Self
  where
    I: IntoIterator<Item = String>,
  {
    let [po_box, extended, street, locality, region, postal_code, country] =
      fixed_components(parts);
    Self {
      po_box,
      extended,
      street,
      locality,
      region,
      postal_code,
      country,
    }
  }

  /// Components in wire order.
  pub fn components(&self) -> [&str; 7] {
    [
      &self.po_box,
      &self.extended,
      &self.street,
      &self.locality,
      &self.region,
      &self.postal_code,
      &self.country,
    ]
  }
}

/// Pad or fold `parts` into exactly `N` components. Surplus parts are joined
/// onto the last component with `;` so no text is dropped.
fn fixed_components<const N: usize, I>(parts: I) -> [String; N]
where
  I: IntoIterator<Item = String>,
{
  let mut out: [String; N] = std::array::from_fn(|_| String::new());
  for (i, part) in parts.into_iter().enumerate() {
    if i < N {
      out[i] = part;
    } else if let Some(last) = out.last_mut() {
      last.push(';');
      last.push_str(&part);
    }
  }
  out
}

/// A latitude/longitude pair (vCard `GEO`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Geo {
  pub latitude:  f64,
  pub longitude: f64,
}

// ─── Parameterized and custom values ─────────────────────────────────────────

/// A value carrying the vCard `TYPE` parameter, e.g. an email tagged
/// `work,home`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Typed<T> {
  pub value: T,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub types: Vec<String>,
}

impl<T> Typed<T> {
  pub fn new(value: T) -> Self {
    Self { value, types: Vec::new() }
  }

  pub fn with_types<I, S>(value: T, types: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    Self {
      value,
      types: types.into_iter().map(Into::into).collect(),
    }
  }
}

/// The photo attached to a contact.
///
/// A `Source` has to be turned into `Encoded` by a
/// [`PhotoResolver`](crate::photo::PhotoResolver) before it can be written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Photo {
  Source(PathBuf),
  /// Base64 JPEG payload, written verbatim.
  Encoded(String),
}

/// One line's worth of an extension property.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CustomValue {
  Scalar(String),
  /// Written as `;`-separated components.
  List(Vec<String>),
}

impl From<&str> for CustomValue {
  fn from(s: &str) -> Self { Self::Scalar(s.to_string()) }
}

impl From<String> for CustomValue {
  fn from(s: String) -> Self { Self::Scalar(s) }
}

impl From<Vec<String>> for CustomValue {
  fn from(v: Vec<String>) -> Self { Self::List(v) }
}

// ─── Contact ─────────────────────────────────────────────────────────────────

/// A single vCard 4.0 contact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contact {
  /// Display name (vCard `FN`). Must not be empty.
  pub formatted_name:  String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub name:            Option<StructuredName>,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub nicknames:       Vec<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub photo:           Option<Photo>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub birthday:        Option<NaiveDate>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub anniversary:     Option<NaiveDate>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub gender:          Option<String>,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub emails:          Vec<Typed<String>>,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub phones:          Vec<Typed<String>>,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub addresses:       Vec<Typed<Address>>,
  /// Organization name followed by unit names (vCard `ORG`).
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub org:             Option<Vec<String>>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub title:           Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub role:            Option<String>,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub urls:            Vec<String>,
  /// Instant-messaging URIs (vCard `IMPP`).
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub impps:           Vec<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub uid:             Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub prodid:          Option<String>,
  /// Revision timestamp, kept as written.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub rev:             Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub tz:              Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub geo:             Option<Geo>,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub categories:      Vec<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub note:            Option<String>,
  /// Extension and unrecognised properties, keyed by upper-cased name.
  #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
  pub custom:          BTreeMap<String, Vec<CustomValue>>,
  /// Written as `X-SOCIALPROFILE`.
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub social_profiles: Vec<Typed<String>>,
}

impl Contact {
  /// Create a contact with only a formatted name.
  pub fn new(formatted_name: impl Into<String>) -> Result<Self> {
    let contact = Self {
      formatted_name: formatted_name.into(),
      name: None,
      nicknames: Vec::new(),
      photo: None,
      birthday: None,
      anniversary: None,
      gender: None,
      emails: Vec::new(),
      phones: Vec::new(),
      addresses: Vec::new(),
      org: None,
      title: None,
      role: None,
      urls: Vec::new(),
      impps: Vec::new(),
      uid: None,
      prodid: None,
      rev: None,
      tz: None,
      geo: None,
      categories: Vec::new(),
      note: None,
      custom: BTreeMap::new(),
      social_profiles: Vec::new(),
    };
    contact.validate()?;
    Ok(contact)
  }

  /// Check the formatted-name invariant.
  pub fn validate(&self) -> Result<()> {
    if self.formatted_name.is_empty() {
      return Err(Error::EmptyFormattedName);
    }
    Ok(())
  }

  /// Append `value` to the extension property `name` (case-insensitive).
  pub fn add_custom(&mut self, name: &str, value: impl Into<CustomValue>) {
    self
      .custom
      .entry(name.to_ascii_uppercase())
      .or_default()
      .push(value.into());
  }

  /// Fill `uid` with a fresh `urn:uuid:` URI if it is absent, returning the
  /// UID in effect.
  pub fn assign_uid(&mut self) -> &str {
    self
      .uid
      .get_or_insert_with(|| format!("urn:uuid:{}", Uuid::new_v4()))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn new_rejects_empty_formatted_name() {
    assert_eq!(Contact::new(""), Err(Error::EmptyFormattedName));
    assert!(Contact::new("Alice").is_ok());
  }

  #[test]
  fn short_address_is_padded() {
    let a = Address::from_components(["".into(), "".into(), "1 Main St".into()]);
    assert_eq!(a.street, "1 Main St");
    assert_eq!(a.components().len(), 7);
    assert_eq!(a.country, "");
  }

  #[test]
  fn surplus_address_components_land_in_country() {
    let parts = (1..=9).map(|i| i.to_string());
    let a = Address::from_components(parts);
    assert_eq!(a.po_box, "1");
    assert_eq!(a.country, "7;8;9");
  }

  #[test]
  fn structured_name_round_trips_components() {
    let n = StructuredName::from_components(
      ["Doe", "Jane", "", "Dr.", ""].map(String::from),
    );
    assert_eq!(n.components(), ["Doe", "Jane", "", "Dr.", ""]);
  }

  #[test]
  fn add_custom_upper_cases_and_appends() {
    let mut c = Contact::new("Alice").unwrap();
    c.add_custom("x-foo", "one");
    c.add_custom("X-Foo", "two");
    assert_eq!(c.custom["X-FOO"], vec![
      CustomValue::from("one"),
      CustomValue::from("two"),
    ]);
  }

  #[test]
  fn assign_uid_keeps_existing_value() {
    let mut c = Contact::new("Alice").unwrap();
    c.uid = Some("abc".to_string());
    assert_eq!(c.assign_uid(), "abc");

    let mut d = Contact::new("Bob").unwrap();
    assert!(d.assign_uid().starts_with("urn:uuid:"));
  }

  #[test]
  fn json_accepts_minimal_contact() {
    let c: Contact = serde_json::from_str(
      r#"{"formatted_name":"Alice","custom":{"X-FOO":["bar",["a","b"]]}}"#,
    )
    .unwrap();
    assert_eq!(c.formatted_name, "Alice");
    assert_eq!(c.custom["X-FOO"], vec![
      CustomValue::Scalar("bar".to_string()),
      CustomValue::List(vec!["a".to_string(), "b".to_string()]),
    ]);
  }
}
