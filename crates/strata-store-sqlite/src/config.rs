//! Global and per-subject configuration rows.
//!
//! The global row is created lazily on first write; until then the store's
//! configured defaults apply. A subject row only holds overrides, with
//! `NULL` meaning "inherit".

use chrono::Utc;
use rusqlite::{Connection, OptionalExtension as _};
use strata_core::{
  config::{
    CompatibilityLevel, GlobalConfig, GlobalConfigUpdate, Mode, SubjectConfig,
    SubjectConfigUpdate,
  },
  value::SubjectName,
};

use crate::{
  encode::{RawGlobalConfig, RawSubjectConfig, encode_dt},
  ledger, Result,
};

// ─── Reads ───────────────────────────────────────────────────────────────────

pub fn global(conn: &Connection, defaults: &GlobalConfig) -> Result<GlobalConfig> {
  let raw = conn
    .query_row(
      "SELECT compatibility, mode, updated_at FROM global_config WHERE id = 1",
      [],
      |row| {
        Ok(RawGlobalConfig {
          compatibility: row.get(0)?,
          mode:          row.get(1)?,
          updated_at:    row.get(2)?,
        })
      },
    )
    .optional()?;

  match raw {
    Some(raw) => raw.into_config(),
    None => Ok(defaults.clone()),
  }
}

pub fn subject(conn: &Connection, subject: &SubjectName) -> Result<Option<SubjectConfig>> {
  let raw = conn
    .query_row(
      "SELECT subject, compatibility, mode, alias, normalize, updated_at
       FROM subject_config WHERE subject = ?1",
      rusqlite::params![subject.as_str()],
      |row| {
        Ok(RawSubjectConfig {
          subject:       row.get(0)?,
          compatibility: row.get(1)?,
          mode:          row.get(2)?,
          alias:         row.get(3)?,
          normalize:     row.get(4)?,
          updated_at:    row.get(5)?,
        })
      },
    )
    .optional()?;
  raw.map(RawSubjectConfig::into_config).transpose()
}

pub fn effective_compatibility(
  conn: &Connection,
  name: &SubjectName,
  defaults: &GlobalConfig,
) -> Result<CompatibilityLevel> {
  let global = global(conn, defaults)?;
  let own = subject(conn, name)?;
  Ok(SubjectConfig::effective_compatibility(own.as_ref(), &global))
}

pub fn effective_mode(conn: &Connection, name: &SubjectName, defaults: &GlobalConfig) -> Result<Mode> {
  let global = global(conn, defaults)?;
  let own = subject(conn, name)?;
  Ok(SubjectConfig::effective_mode(own.as_ref(), &global))
}

// ─── Writes ──────────────────────────────────────────────────────────────────

pub fn set_global(
  conn: &Connection,
  defaults: &GlobalConfig,
  update: &GlobalConfigUpdate,
  force: bool,
) -> Result<GlobalConfig> {
  let current = global(conn, defaults)?;

  if update.mode == Some(Mode::Import)
    && current.mode != Mode::Import
    && !force
    && ledger::any_active(conn)?
  {
    return Err(
      strata_core::Error::ModeTransition(
        "cannot enter IMPORT mode globally while subjects have active versions; \
         retry with force=true"
          .into(),
      )
      .into(),
    );
  }

  let now = Utc::now();
  let next = GlobalConfig {
    compatibility: update.compatibility.unwrap_or(current.compatibility),
    mode:          update.mode.unwrap_or(current.mode),
    updated_at:    Some(now),
  };

  conn.execute(
    "INSERT INTO global_config (id, compatibility, mode, updated_at)
     VALUES (1, ?1, ?2, ?3)
     ON CONFLICT (id) DO UPDATE SET
       compatibility = excluded.compatibility,
       mode          = excluded.mode,
       updated_at    = excluded.updated_at",
    rusqlite::params![
      next.compatibility.to_string(),
      next.mode.to_string(),
      encode_dt(now),
    ],
  )?;

  tracing::info!(compatibility = %next.compatibility, mode = %next.mode, "updated global config");
  Ok(next)
}

pub fn set_subject(
  conn: &Connection,
  defaults: &GlobalConfig,
  name: &SubjectName,
  update: &SubjectConfigUpdate,
  force: bool,
) -> Result<SubjectConfig> {
  let current = subject(conn, name)?;

  if update.mode == Some(Mode::Import) && !force {
    let global = global(conn, defaults)?;
    let mode = SubjectConfig::effective_mode(current.as_ref(), &global);
    if mode != Mode::Import && ledger::has_active(conn, name)? {
      return Err(
        strata_core::Error::ModeTransition(format!(
          "cannot enter IMPORT mode for subject '{name}' while it has active versions; \
           retry with force=true"
        ))
        .into(),
      );
    }
  }

  let (compatibility, mode, alias, normalize) = match current {
    Some(c) => (c.compatibility, c.mode, c.alias, c.normalize),
    None => (None, None, None, false),
  };
  let next = SubjectConfig {
    subject:       name.clone(),
    compatibility: update.compatibility.or(compatibility),
    mode:          update.mode.or(mode),
    alias:         update.alias.clone().or(alias),
    normalize:     update.normalize.unwrap_or(normalize),
    updated_at:    Utc::now(),
  };

  conn.execute(
    "INSERT INTO subject_config (subject, compatibility, mode, alias, normalize, updated_at)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6)
     ON CONFLICT (subject) DO UPDATE SET
       compatibility = excluded.compatibility,
       mode          = excluded.mode,
       alias         = excluded.alias,
       normalize     = excluded.normalize,
       updated_at    = excluded.updated_at",
    rusqlite::params![
      name.as_str(),
      next.compatibility.map(|c| c.to_string()),
      next.mode.map(|m| m.to_string()),
      next.alias,
      next.normalize,
      encode_dt(next.updated_at),
    ],
  )?;

  tracing::info!(subject = %name, ?update, "updated subject config");
  Ok(next)
}

/// Remove every override of `name`. Returns whether a row existed.
pub fn delete_subject(conn: &Connection, name: &SubjectName) -> Result<bool> {
  let n = conn.execute(
    "DELETE FROM subject_config WHERE subject = ?1",
    rusqlite::params![name.as_str()],
  )?;
  Ok(n > 0)
}

/// Remove only the mode override of `name`.
pub fn clear_mode(conn: &Connection, name: &SubjectName) -> Result<()> {
  conn.execute(
    "UPDATE subject_config SET mode = NULL, updated_at = ?2 WHERE subject = ?1",
    rusqlite::params![name.as_str(), encode_dt(Utc::now())],
  )?;
  Ok(())
}
