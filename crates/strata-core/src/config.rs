//! Compatibility levels, operational modes, and the global / per-subject
//! configuration rows that select them.
//!
//! Both enums are closed sets whose facets are fixed data looked up by
//! variant; nothing about them is overridable.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use crate::{Error, Result, value::SubjectName};

// ─── Compatibility level ─────────────────────────────────────────────────────

/// Which historical versions a new schema must stay compatible with, and in
/// which direction(s).
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Default,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum CompatibilityLevel {
  None,
  #[default]
  Backward,
  BackwardTransitive,
  Forward,
  ForwardTransitive,
  Full,
  FullTransitive,
}

impl CompatibilityLevel {
  /// `(backward, forward, transitive)`.
  const fn facets(self) -> (bool, bool, bool) {
    match self {
      Self::None => (false, false, false),
      Self::Backward => (true, false, false),
      Self::BackwardTransitive => (true, false, true),
      Self::Forward => (false, true, false),
      Self::ForwardTransitive => (false, true, true),
      Self::Full => (true, true, false),
      Self::FullTransitive => (true, true, true),
    }
  }

  /// The new schema must be able to read data written with older ones.
  pub const fn checks_backward(self) -> bool { self.facets().0 }

  /// Older schemas must be able to read data written with the new one.
  pub const fn checks_forward(self) -> bool { self.facets().1 }

  /// Check against every prior version rather than only the newest.
  pub const fn transitive(self) -> bool { self.facets().2 }

  pub fn parse(value: &str) -> Result<Self> {
    value.trim().parse().map_err(|_| {
      Error::ConfigValidation(format!(
        "Invalid compatibility level: {value}. Supported: NONE, BACKWARD, \
         BACKWARD_TRANSITIVE, FORWARD, FORWARD_TRANSITIVE, FULL, FULL_TRANSITIVE"
      ))
    })
  }
}

// ─── Mode ────────────────────────────────────────────────────────────────────

/// Operational gate on read/write/import behaviour.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Default,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  AsRefStr,
)]
#[strum(ascii_case_insensitive)]
pub enum Mode {
  #[default]
  #[serde(rename = "READWRITE")]
  #[strum(serialize = "READWRITE")]
  ReadWrite,
  #[serde(rename = "READONLY")]
  #[strum(serialize = "READONLY")]
  ReadOnly,
  /// Read-only intent with writes still accepted; the override is not
  /// enforced separately.
  #[serde(rename = "READONLY_OVERRIDE")]
  #[strum(serialize = "READONLY_OVERRIDE")]
  ReadOnlyOverride,
  /// Skips compatibility checks and honours caller-supplied schema ids.
  #[serde(rename = "IMPORT")]
  #[strum(serialize = "IMPORT")]
  Import,
  /// Writes go to a leader in a cluster; identical to `ReadWrite` on a
  /// single node.
  #[serde(rename = "FORWARD")]
  #[strum(serialize = "FORWARD")]
  Forward,
}

impl Mode {
  /// `(read, write, import)`.
  const fn facets(self) -> (bool, bool, bool) {
    match self {
      Self::ReadWrite => (true, true, false),
      Self::ReadOnly => (true, false, false),
      Self::ReadOnlyOverride => (true, true, false),
      Self::Import => (true, true, true),
      Self::Forward => (true, true, false),
    }
  }

  pub const fn read_allowed(self) -> bool { self.facets().0 }

  pub const fn write_allowed(self) -> bool { self.facets().1 }

  pub const fn import_mode(self) -> bool { self.facets().2 }

  pub fn parse(value: &str) -> Result<Self> {
    value.trim().parse().map_err(|_| {
      Error::ConfigValidation(format!(
        "Invalid mode: {value}. Supported: READWRITE, READONLY, READONLY_OVERRIDE, \
         IMPORT, FORWARD"
      ))
    })
  }
}

// ─── Config rows ─────────────────────────────────────────────────────────────

/// The process-wide defaults every subject inherits.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalConfig {
  pub compatibility: CompatibilityLevel,
  pub mode:          Mode,
  /// `None` until the row is first written.
  pub updated_at:    Option<DateTime<Utc>>,
}

/// Per-subject overrides. A `None` field inherits from [`GlobalConfig`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectConfig {
  pub subject:       SubjectName,
  pub compatibility: Option<CompatibilityLevel>,
  pub mode:          Option<Mode>,
  pub alias:         Option<String>,
  pub normalize:     bool,
  pub updated_at:    DateTime<Utc>,
}

impl SubjectConfig {
  pub fn effective_compatibility(config: Option<&Self>, global: &GlobalConfig) -> CompatibilityLevel {
    config.and_then(|c| c.compatibility).unwrap_or(global.compatibility)
  }

  pub fn effective_mode(config: Option<&Self>, global: &GlobalConfig) -> Mode {
    config.and_then(|c| c.mode).unwrap_or(global.mode)
  }
}

/// Partial update of [`GlobalConfig`]; `None` leaves a field unchanged.
#[derive(Debug, Clone, Default)]
pub struct GlobalConfigUpdate {
  pub compatibility: Option<CompatibilityLevel>,
  pub mode:          Option<Mode>,
}

/// Partial update of a [`SubjectConfig`]; `None` leaves a field unchanged.
#[derive(Debug, Clone, Default)]
pub struct SubjectConfigUpdate {
  pub compatibility: Option<CompatibilityLevel>,
  pub mode:          Option<Mode>,
  pub alias:         Option<String>,
  pub normalize:     Option<bool>,
}
