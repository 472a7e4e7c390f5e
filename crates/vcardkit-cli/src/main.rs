//! `vcardkit` — convert contacts between JSON and vCard 4.0.
//!
//! # Usage
//!
//! ```text
//! vcardkit encode contacts.json -o contacts.vcf --photo alice.jpg
//! vcardkit decode contacts.vcf > contacts.json
//! ```

mod resolver;
mod settings;

use std::{
  fs,
  io::{self, Read, Write},
  path::{Path, PathBuf},
};

use anyhow::{Context as _, bail};
use clap::{Parser, Subcommand};
use resolver::FileResolver;
use serde::Deserialize;
use settings::Settings;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use vcardkit::{Contact, EncodeOptions, Photo};

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(author, version, about = "Convert contacts between JSON and vCard 4.0")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "vcardkit.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Read JSON contacts and write vCard text.
  Encode {
    /// JSON file holding one contact or an array of contacts (default: stdin).
    input: Option<PathBuf>,

    /// Where to write the vCard text (default: stdout).
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Image to embed as the contact's PHOTO, scaled to fit 300 px and
    /// re-encoded as JPEG (single contact only).
    #[arg(long, value_name = "FILE")]
    photo: Option<PathBuf>,

    /// Give every contact without a UID a fresh `urn:uuid:` UID.
    #[arg(long)]
    assign_uid: bool,
  },

  /// Read vCard text and write a JSON array of contacts.
  Decode {
    /// vCard file, possibly holding several cards (default: stdin).
    input: Option<PathBuf>,

    /// Where to write the JSON (default: stdout).
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,
  },
}

/// JSON input shape for `encode`.
#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
  Many(Vec<Contact>),
  One(Box<Contact>),
}

// ─── Entry point ──────────────────────────────────────────────────────────────

fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_writer(io::stderr)
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();
  let settings = Settings::load(&cli.config)?;

  match cli.command {
    Command::Encode {
      input,
      output,
      photo,
      assign_uid,
    } => encode(&settings, input.as_deref(), output.as_deref(), photo, assign_uid),
    Command::Decode { input, output } => decode(input.as_deref(), output.as_deref()),
  }
}

// ─── Commands ─────────────────────────────────────────────────────────────────

fn encode(
  settings: &Settings,
  input: Option<&Path>,
  output: Option<&Path>,
  photo: Option<PathBuf>,
  assign_uid: bool,
) -> anyhow::Result<()> {
  let raw = read_input(input)?;
  let text = encode_json(&raw, photo.as_deref(), assign_uid, &settings.encode_options())?;
  write_output(output, &text)
}

fn decode(input: Option<&Path>, output: Option<&Path>) -> anyhow::Result<()> {
  let raw = read_input(input)?;
  let decoded = decode_text(&raw);

  let json =
    serde_json::to_string_pretty(&decoded.contacts).context("serialising contacts")?;
  write_output(output, &(json + "\n"))?;

  if decoded.failed > 0 {
    bail!(
      "{} of {} cards failed to decode",
      decoded.failed,
      decoded.total()
    );
  }
  tracing::info!(count = decoded.total(), "decoded contacts");
  Ok(())
}

/// Turn a JSON contact (or array of contacts) into concatenated vCards.
fn encode_json(
  raw: &str,
  photo: Option<&Path>,
  assign_uid: bool,
  options: &EncodeOptions,
) -> anyhow::Result<String> {
  let mut contacts = match serde_json::from_str(raw).context("parsing JSON contacts")? {
    OneOrMany::Many(cs) => cs,
    OneOrMany::One(c) => vec![*c],
  };

  if let Some(path) = photo {
    let count = contacts.len();
    let [contact] = contacts.as_mut_slice() else {
      bail!("--photo needs exactly one contact, got {count}");
    };
    contact.photo = Some(Photo::Source(path.to_path_buf()));
    contact
      .resolve_photo(&FileResolver::default())
      .with_context(|| format!("reading photo {}", path.display()))?;
  }

  let mut out = String::new();
  for contact in &mut contacts {
    if assign_uid {
      contact.assign_uid();
    }
    let card = vcardkit::to_text_with(contact, options)
      .with_context(|| format!("encoding contact {:?}", contact.formatted_name))?;
    out.push_str(&card);
  }

  tracing::info!(count = contacts.len(), "encoded contacts");
  Ok(out)
}

struct Decoded {
  contacts: Vec<Contact>,
  failed:   usize,
}

impl Decoded {
  fn total(&self) -> usize { self.contacts.len() + self.failed }
}

/// Decode every card in `raw`, logging and counting the ones that fail.
fn decode_text(raw: &str) -> Decoded {
  let mut results = vcardkit::from_text_many(raw);
  if results.is_empty() && !raw.trim().is_empty() {
    // No envelope at all; treat the whole input as one card.
    results.push(vcardkit::from_text(raw));
  }

  let mut decoded = Decoded {
    contacts: Vec::with_capacity(results.len()),
    failed:   0,
  };
  for (idx, result) in results.into_iter().enumerate() {
    match result {
      Ok(contact) => decoded.contacts.push(contact),
      Err(e) => {
        tracing::error!(card = idx + 1, error = %e, "failed to decode card");
        decoded.failed += 1;
      }
    }
  }
  decoded
}

// ─── I/O helpers ──────────────────────────────────────────────────────────────

fn read_input(path: Option<&Path>) -> anyhow::Result<String> {
  match path {
    Some(p) => {
      fs::read_to_string(p).with_context(|| format!("reading {}", p.display()))
    }
    None => {
      let mut buf = String::new();
      io::stdin()
        .read_to_string(&mut buf)
        .context("reading stdin")?;
      Ok(buf)
    }
  }
}

fn write_output(path: Option<&Path>, data: &str) -> anyhow::Result<()> {
  match path {
    Some(p) => fs::write(p, data).with_context(|| format!("writing {}", p.display())),
    None => {
      let mut stdout = io::stdout().lock();
      stdout.write_all(data.as_bytes()).context("writing stdout")?;
      stdout.flush().context("flushing stdout")
    }
  }
}

#[cfg(test)]
mod tests {
  use image::RgbImage;

  use super::*;

  const ALICE: &str = r#"{"formatted_name":"Alice"}"#;
  const TWO: &str = r#"[{"formatted_name":"Alice"},{"formatted_name":"Bob"}]"#;

  fn options() -> EncodeOptions { EncodeOptions::default() }

  // ── encode ──────────────────────────────────────────────────────────────────

  #[test]
  fn encode_accepts_a_single_object() {
    let out = encode_json(ALICE, None, false, &options()).unwrap();
    assert_eq!(out, "BEGIN:VCARD\r\nVERSION:4.0\r\nFN:Alice\r\nEND:VCARD\r\n");
  }

  #[test]
  fn encode_accepts_an_array() {
    let out = encode_json(TWO, None, false, &options()).unwrap();
    assert_eq!(out.matches("BEGIN:VCARD").count(), 2);
    assert!(out.contains("FN:Bob\r\n"));
  }

  #[test]
  fn encode_rejects_invalid_json() {
    assert!(encode_json("{", None, false, &options()).is_err());
    assert!(encode_json(r#"{"formatted_name":""}"#, None, false, &options()).is_err());
  }

  #[test]
  fn photo_needs_exactly_one_contact() {
    let err = encode_json(TWO, Some(Path::new("unused.jpg")), false, &options())
      .unwrap_err();
    assert_eq!(err.to_string(), "--photo needs exactly one contact, got 2");
  }

  #[test]
  fn photo_is_embedded() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("alice.png");
    RgbImage::new(8, 8).save(&path).unwrap();

    let out = encode_json(ALICE, Some(&path), false, &options()).unwrap();
    assert!(out.contains("\r\nPHOTO;ENCODING=b;MEDIATYPE=image/jpeg:/9j/"));
  }

  #[test]
  fn missing_photo_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.png");
    let err = encode_json(ALICE, Some(&path), false, &options()).unwrap_err();
    assert!(err.to_string().starts_with("reading photo "));
  }

  #[test]
  fn assign_uid_fills_missing_uids_only() {
    let input = r#"[{"formatted_name":"Alice"},{"formatted_name":"Bob","uid":"bob-1"}]"#;
    let out = encode_json(input, None, true, &options()).unwrap();
    assert_eq!(out.matches("UID:urn:uuid:").count(), 1);
    assert!(out.contains("UID:bob-1\r\n"));
  }

  #[test]
  fn fold_limit_comes_from_options() {
    let input = format!(r#"{{"formatted_name":"Alice","note":"{}"}}"#, "x".repeat(100));
    let out = encode_json(&input, None, false, &EncodeOptions { fold_limit: 30 }).unwrap();
    assert!(out.split("\r\n").all(|l| l.len() <= 30));
  }

  // ── decode ──────────────────────────────────────────────────────────────────

  #[test]
  fn decode_counts_failed_cards() {
    let input = concat!(
      "BEGIN:VCARD\r\nVERSION:4.0\r\nN:Nameless;;;;\r\nEND:VCARD\r\n",
      "BEGIN:VCARD\r\nVERSION:4.0\r\nFN:Bob\r\nEND:VCARD\r\n",
      "BEGIN:VCARD\r\nVERSION:4.0\r\nFN:Eve\r\nBDAY:someday\r\nEND:VCARD\r\n",
    );
    let decoded = decode_text(input);
    assert_eq!(decoded.failed, 2);
    assert_eq!(decoded.total(), 3);
    assert_eq!(decoded.contacts[0].formatted_name, "Bob");
  }

  #[test]
  fn decode_without_envelope_is_one_card() {
    let decoded = decode_text("FN:Bare\r\nEMAIL:b@x.org\r\n");
    assert_eq!(decoded.failed, 0);
    assert_eq!(decoded.contacts.len(), 1);
    assert_eq!(decoded.contacts[0].emails[0].value, "b@x.org");
  }

  #[test]
  fn decode_of_empty_input_is_empty() {
    let decoded = decode_text("  \r\n");
    assert_eq!(decoded.total(), 0);
  }

  #[test]
  fn encoded_output_decodes_back() {
    let out = encode_json(TWO, None, false, &options()).unwrap();
    let decoded = decode_text(&out);
    let names: Vec<&str> =
      decoded.contacts.iter().map(|c| c.formatted_name.as_str()).collect();
    assert_eq!(names, ["Alice", "Bob"]);
  }
}
