//! Compatibility evaluation of a candidate schema against a subject's
//! history.
//!
//! The format-specific question "can a reader with schema R decode data
//! written with schema W?" is delegated to a [`CompatibilityOracle`]. The
//! [`CompatibilityEngine`] decides which historical versions to ask about
//! and in which direction(s), according to a [`CompatibilityLevel`].

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{
  config::CompatibilityLevel,
  value::{SchemaId, SchemaType, Version},
};

// ─── Oracle ──────────────────────────────────────────────────────────────────

/// Outcome of one reader/writer resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
  Compatible,
  Incompatible(String),
}

/// A schema body plus the bodies of every schema it references, transitively,
/// dependencies first.
#[derive(Debug, Clone, Copy)]
pub struct SchemaText<'a> {
  pub text:         &'a str,
  pub dependencies: &'a [String],
}

impl<'a> SchemaText<'a> {
  /// A body with no references.
  pub fn new(text: &'a str) -> Self { Self { text, dependencies: &[] } }

  pub fn with_dependencies(text: &'a str, dependencies: &'a [String]) -> Self {
    Self { text, dependencies }
  }
}

/// A format-specific parser and reader/writer resolver.
pub trait CompatibilityOracle: Send + Sync {
  /// Parse `schema` as a schema of `format`; `Err` carries the parser's
  /// message.
  fn validate(&self, format: SchemaType, schema: SchemaText<'_>) -> Result<(), String>;

  /// Whether data written with `writer` can be read with `reader`.
  fn can_read(&self, format: SchemaType, reader: SchemaText<'_>, writer: SchemaText<'_>) -> Verdict;

  /// Structural equality of two schema texts. Unparseable input is never
  /// identical to anything.
  fn identical(&self, format: SchemaType, a: &str, b: &str) -> bool;

  /// Rewrite `text` into canonical form. The default keeps it unchanged.
  fn normalize(&self, _format: SchemaType, text: String) -> String { text }
}

// ─── Violations ──────────────────────────────────────────────────────────────

/// Which way a failed resolution was attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
  /// New schema reading data written with the historical one.
  Backward,
  /// Historical schema reading data written with the new one.
  Forward,
}

impl fmt::Display for Direction {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      Self::Backward => "Backward",
      Self::Forward => "Forward",
    })
  }
}

/// One failed resolution between the candidate and a historical version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
  pub direction: Direction,
  pub version:   Version,
  pub schema_id: SchemaId,
  pub reason:    String,
}

impl fmt::Display for Violation {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(
      f,
      "{} compatibility check failed against version {} (schema id {}): {}",
      self.direction, self.version, self.schema_id, self.reason
    )
  }
}

/// A previously registered version, as the engine sees it.
#[derive(Debug, Clone)]
pub struct HistoricalSchema {
  pub version:      Version,
  pub schema_id:    SchemaId,
  pub text:         String,
  /// Bodies of the schemas this version references, dependencies first.
  pub dependencies: Vec<String>,
}

impl HistoricalSchema {
  pub fn source(&self) -> SchemaText<'_> {
    SchemaText::with_dependencies(&self.text, &self.dependencies)
  }
}

// ─── Engine ──────────────────────────────────────────────────────────────────

/// Applies a [`CompatibilityLevel`] over a history using an oracle.
#[derive(Clone, Copy)]
pub struct CompatibilityEngine<'o> {
  oracle: &'o dyn CompatibilityOracle,
}

impl<'o> CompatibilityEngine<'o> {
  pub fn new(oracle: &'o dyn CompatibilityOracle) -> Self { Self { oracle } }

  /// How many of the newest historical versions `level` needs to see.
  /// `None` means all of them.
  pub fn scope(level: CompatibilityLevel) -> Option<usize> {
    match level {
      CompatibilityLevel::None => Some(0),
      l if l.transitive() => None,
      _ => Some(1),
    }
  }

  /// Check `candidate` against `history` (newest first).
  ///
  /// Every version in the level's scope is evaluated in both required
  /// directions, so the returned list is complete. Empty means compatible.
  pub fn check(
    &self,
    format: SchemaType,
    candidate: SchemaText<'_>,
    history: &[HistoricalSchema],
    level: CompatibilityLevel,
  ) -> Vec<Violation> {
    let in_scope = match Self::scope(level) {
      Some(n) => &history[..n.min(history.len())],
      None => history,
    };

    let mut violations = Vec::new();
    for prior in in_scope {
      if level.checks_backward()
        && let Verdict::Incompatible(reason) = self.oracle.can_read(format, candidate, prior.source())
      {
        violations.push(Violation {
          direction: Direction::Backward,
          version: prior.version,
          schema_id: prior.schema_id,
          reason,
        });
      }
      if level.checks_forward()
        && let Verdict::Incompatible(reason) = self.oracle.can_read(format, prior.source(), candidate)
      {
        violations.push(Violation {
          direction: Direction::Forward,
          version: prior.version,
          schema_id: prior.schema_id,
          reason,
        });
      }
    }
    violations
  }

  pub fn identical(&self, format: SchemaType, a: &str, b: &str) -> bool {
    self.oracle.identical(format, a, b)
  }
}
