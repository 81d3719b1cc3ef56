//! Validated value objects: subject names, contexts, ids, versions, hashes.
//!
//! Each type is built through a constructor that checks its invariants and
//! returns [`Error::InvalidValue`] instead of panicking. Serde goes through
//! the same constructors, so a deserialised value is always valid.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use strum::{Display, EnumString};

use crate::{Error, Result};

const MAX_SUBJECT_LEN: usize = 255;

// ─── Subject ─────────────────────────────────────────────────────────────────

/// A named, independently versioned scope, optionally prefixed with a
/// tenancy context (`:.tenant.:orders-value`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SubjectName(String);

impl SubjectName {
  pub fn new(value: impl Into<String>) -> Result<Self> {
    let value = value.into();
    if value.trim().is_empty() {
      return Err(Error::InvalidValue("Subject name cannot be blank".into()));
    }
    if value.chars().count() > MAX_SUBJECT_LEN {
      return Err(Error::InvalidValue(format!(
        "Subject name cannot exceed {MAX_SUBJECT_LEN} characters"
      )));
    }
    Ok(Self(value))
  }

  pub fn as_str(&self) -> &str { &self.0 }

  /// `true` if the name starts with a `:.<context>.:` prefix.
  pub fn has_context(&self) -> bool { self.context_end().is_some() }

  /// The context this subject lives in; [`Context::default`] when the name
  /// carries no prefix.
  pub fn context(&self) -> Context {
    match self.context_end() {
      Some(end) => Context(self.0[..end].to_owned()),
      None => Context::default(),
    }
  }

  /// The subject name with any context prefix stripped.
  pub fn unqualified(&self) -> &str {
    match self.context_end() {
      Some(end) => &self.0[end..],
      None => &self.0,
    }
  }

  /// Byte offset just past the closing `.:` of a context prefix.
  fn context_end(&self) -> Option<usize> {
    let rest = self.0.strip_prefix(":.")?;
    let close = rest.find(".:")?;
    // `:..:` would be an empty context name.
    (close > 0).then_some(close + 4)
  }
}

impl fmt::Display for SubjectName {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

impl TryFrom<String> for SubjectName {
  type Error = Error;

  fn try_from(value: String) -> Result<Self> { Self::new(value) }
}

impl From<SubjectName> for String {
  fn from(value: SubjectName) -> Self { value.0 }
}

impl FromStr for SubjectName {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> { Self::new(s) }
}

// ─── Context ─────────────────────────────────────────────────────────────────

/// A tenancy scope partitioning the subject namespace.
///
/// Either the default context `.` or a delimited name `:.tenant.:`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Context(String);

impl Context {
  pub const DEFAULT: &'static str = ".";

  pub fn new(value: impl Into<String>) -> Result<Self> {
    let value = value.into();
    if value == Self::DEFAULT {
      return Ok(Self(value));
    }
    let valid = value.len() > 4 && value.starts_with(":.") && value.ends_with(".:");
    if !valid {
      return Err(Error::InvalidValue(format!(
        "Context must be '.' (default) or format ':.name.:', got: {value}"
      )));
    }
    Ok(Self(value))
  }

  pub fn is_default(&self) -> bool { self.0 == Self::DEFAULT }

  /// The context name without delimiters; empty for the default context.
  pub fn name(&self) -> &str {
    if self.is_default() { "" } else { &self.0[2..self.0.len() - 2] }
  }

  pub fn as_str(&self) -> &str { &self.0 }
}

impl Default for Context {
  fn default() -> Self { Self(Self::DEFAULT.to_owned()) }
}

impl fmt::Display for Context {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

impl TryFrom<String> for Context {
  type Error = Error;

  fn try_from(value: String) -> Result<Self> { Self::new(value) }
}

impl From<Context> for String {
  fn from(value: Context) -> Self { value.0 }
}

// ─── Schema id ───────────────────────────────────────────────────────────────

/// Globally unique identifier of a distinct schema body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u32")]
pub struct SchemaId(u32);

impl SchemaId {
  pub fn new(value: i64) -> Result<Self> {
    match u32::try_from(value) {
      Ok(v) if v > 0 => Ok(Self(v)),
      _ => Err(Error::InvalidValue(format!("Schema ID must be positive, got: {value}"))),
    }
  }

  pub fn get(self) -> u32 { self.0 }
}

impl fmt::Display for SchemaId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

impl TryFrom<i64> for SchemaId {
  type Error = Error;

  fn try_from(value: i64) -> Result<Self> { Self::new(value) }
}

impl From<SchemaId> for u32 {
  fn from(value: SchemaId) -> Self { value.0 }
}

impl FromStr for SchemaId {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    let n = s
      .parse::<i64>()
      .map_err(|_| Error::InvalidValue(format!("Schema ID must be an integer, got: {s}")))?;
    Self::new(n)
  }
}

// ─── Version ─────────────────────────────────────────────────────────────────

/// A positive, subject-scoped registration sequence number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u32")]
pub struct Version(u32);

impl Version {
  pub fn new(value: i64) -> Result<Self> {
    match u32::try_from(value) {
      Ok(v) if v > 0 => Ok(Self(v)),
      _ => Err(Error::InvalidValue(format!("Version must be positive, got: {value}"))),
    }
  }

  pub fn get(self) -> u32 { self.0 }
}

impl fmt::Display for Version {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

impl TryFrom<i64> for Version {
  type Error = Error;

  fn try_from(value: i64) -> Result<Self> { Self::new(value) }
}

impl From<Version> for u32 {
  fn from(value: Version) -> Self { value.0 }
}

/// A version as addressed by a caller: a concrete number, or the highest
/// version that passes the query's deletion filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionSelector {
  Exact(Version),
  Latest,
}

impl VersionSelector {
  pub fn exact(self) -> Option<Version> {
    match self {
      Self::Exact(v) => Some(v),
      Self::Latest => None,
    }
  }
}

impl From<Version> for VersionSelector {
  fn from(value: Version) -> Self { Self::Exact(value) }
}

impl fmt::Display for VersionSelector {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Exact(v) => v.fmt(f),
      Self::Latest => f.write_str("latest"),
    }
  }
}

impl FromStr for VersionSelector {
  type Err = Error;

  /// Accepts `latest` (any case), `-1`, or a positive integer.
  fn from_str(s: &str) -> Result<Self> {
    if s.eq_ignore_ascii_case("latest") {
      return Ok(Self::Latest);
    }
    match s.parse::<i64>() {
      Ok(-1) => Ok(Self::Latest),
      Ok(n) => Version::new(n).map(Self::Exact),
      Err(_) => Err(Error::InvalidValue(format!(
        "Version must be an integer or 'latest', got: {s}"
      ))),
    }
  }
}

// ─── Content hash ────────────────────────────────────────────────────────────

/// SHA-256 of a schema's UTF-8 text, as 64 lowercase hex characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ContentHash(String);

impl ContentHash {
  pub fn compute(text: &str) -> Self { Self(hex::encode(Sha256::digest(text.as_bytes()))) }

  pub fn parse(value: impl Into<String>) -> Result<Self> {
    let value = value.into();
    let well_formed = value.len() == 64
      && value.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
    if !well_formed {
      return Err(Error::InvalidValue(format!(
        "Content hash must be 64 lowercase hexadecimal characters, got: {value}"
      )));
    }
    Ok(Self(value))
  }

  pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for ContentHash {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

impl TryFrom<String> for ContentHash {
  type Error = Error;

  fn try_from(value: String) -> Result<Self> { Self::parse(value) }
}

impl From<ContentHash> for String {
  fn from(value: ContentHash) -> Self { value.0 }
}

// ─── Schema type ─────────────────────────────────────────────────────────────

/// The serialization format a schema body is written in.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum SchemaType {
  #[default]
  Avro,
  Json,
  Protobuf,
}

impl SchemaType {
  pub fn parse(value: &str) -> Result<Self> {
    value
      .parse()
      .map_err(|_| Error::InvalidValue(format!("Invalid schema type: {value}")))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn subject_name_rejects_blank_and_long() {
    assert!(SubjectName::new("  ").is_err());
    assert!(SubjectName::new("a".repeat(256)).is_err());
    assert!(SubjectName::new("a".repeat(255)).is_ok());
  }

  #[test]
  fn subject_without_prefix_is_in_default_context() {
    let s = SubjectName::new("orders-value").unwrap();
    assert!(!s.has_context());
    assert!(s.context().is_default());
    assert_eq!(s.unqualified(), "orders-value");
  }

  #[test]
  fn subject_context_prefix_is_extracted() {
    let s = SubjectName::new(":.tenant1.:orders-value").unwrap();
    assert!(s.has_context());
    assert_eq!(s.context().as_str(), ":.tenant1.:");
    assert_eq!(s.context().name(), "tenant1");
    assert_eq!(s.unqualified(), "orders-value");
  }

  #[test]
  fn context_validates_delimiters() {
    assert!(Context::new(".").unwrap().is_default());
    assert!(Context::new(":.a.:").is_ok());
    assert!(Context::new("tenant").is_err());
    assert!(Context::new(":..:").is_err());
  }

  #[test]
  fn ids_and_versions_must_be_positive() {
    assert!(SchemaId::new(0).is_err());
    assert!(SchemaId::new(-3).is_err());
    assert_eq!(SchemaId::new(7).unwrap().get(), 7);
    assert!(Version::new(0).is_err());
    assert_eq!(Version::new(1).unwrap().get(), 1);
  }

  #[test]
  fn version_selector_parses_latest_forms() {
    assert_eq!("latest".parse::<VersionSelector>().unwrap(), VersionSelector::Latest);
    assert_eq!("LATEST".parse::<VersionSelector>().unwrap(), VersionSelector::Latest);
    assert_eq!("-1".parse::<VersionSelector>().unwrap(), VersionSelector::Latest);
    assert_eq!(
      "3".parse::<VersionSelector>().unwrap(),
      VersionSelector::Exact(Version::new(3).unwrap())
    );
    assert!("0".parse::<VersionSelector>().is_err());
    assert!("abc".parse::<VersionSelector>().is_err());
  }

  #[test]
  fn content_hash_is_stable_and_well_formed() {
    let a = ContentHash::compute(r#"{"type":"string"}"#);
    let b = ContentHash::compute(r#"{"type":"string"}"#);
    assert_eq!(a, b);
    assert_ne!(a, ContentHash::compute(r#"{"type":"int"}"#));
    assert!(ContentHash::parse(a.as_str()).is_ok());
    assert!(ContentHash::parse("ABC").is_err());
  }

  #[test]
  fn schema_type_parses_case_insensitively() {
    assert_eq!(SchemaType::parse("avro").unwrap(), SchemaType::Avro);
    assert_eq!(SchemaType::parse("PROTOBUF").unwrap(), SchemaType::Protobuf);
    assert_eq!(SchemaType::Json.to_string(), "JSON");
    assert!(SchemaType::parse("xml").is_err());
  }

  #[test]
  fn subject_name_deserialises_through_constructor() {
    let ok: SubjectName = serde_json::from_str(r#""a-value""#).unwrap();
    assert_eq!(ok.as_str(), "a-value");
    assert!(serde_json::from_str::<SubjectName>(r#""""#).is_err());
  }
}
