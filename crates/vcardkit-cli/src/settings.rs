//! Runtime settings, read from an optional TOML file and `VCARDKIT_*`
//! environment variables.

use std::path::Path;

use anyhow::Context as _;
use serde::Deserialize;
use vcardkit::{EncodeOptions, text::DEFAULT_FOLD_LIMIT};

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
  /// Physical line limit for encoded output, in octets.
  #[serde(default = "default_fold_limit")]
  pub fold_limit: usize,
}

fn default_fold_limit() -> usize { DEFAULT_FOLD_LIMIT }

impl Settings {
  /// Load settings; a missing file is not an error.
  pub fn load(path: &Path) -> anyhow::Result<Self> {
    config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(config::Environment::with_prefix("VCARDKIT"))
      .build()
      .with_context(|| format!("failed to read config file {}", path.display()))?
      .try_deserialize()
      .context("failed to deserialise Settings")
  }

  pub fn encode_options(&self) -> EncodeOptions {
    EncodeOptions {
      fold_limit: self.fold_limit,
    }
  }
}
