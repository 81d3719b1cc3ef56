//! SQL schema for the Strata SQLite store.
//!
//! Executed once at connection startup via `PRAGMA user_version`. Future
//! migrations will be gated on that version number.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- Schema bodies are write-once. One row per distinct text.
CREATE TABLE IF NOT EXISTS schemas (
    id           INTEGER PRIMARY KEY,
    schema_type  TEXT NOT NULL,      -- 'AVRO' | 'JSON' | 'PROTOBUF'
    schema_text  TEXT NOT NULL,
    content_hash TEXT NOT NULL UNIQUE,
    created_at   TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS subject_versions (
    id         INTEGER PRIMARY KEY AUTOINCREMENT,
    subject    TEXT    NOT NULL,
    version    INTEGER NOT NULL,
    schema_id  INTEGER NOT NULL REFERENCES schemas(id),
    deleted    INTEGER NOT NULL DEFAULT 0,
    created_at TEXT    NOT NULL,
    UNIQUE (subject, version),
    CHECK  (version > 0)
);

-- Edges from a schema to the subject versions it depends on. Not enforced
-- against subject_versions: a hard delete may leave dangling edges.
CREATE TABLE IF NOT EXISTS schema_references (
    schema_id          INTEGER NOT NULL REFERENCES schemas(id),
    name               TEXT    NOT NULL,
    referenced_subject TEXT    NOT NULL,
    referenced_version INTEGER NOT NULL,
    PRIMARY KEY (schema_id, name)
);

CREATE TABLE IF NOT EXISTS global_config (
    id            INTEGER PRIMARY KEY CHECK (id = 1),
    compatibility TEXT NOT NULL,
    mode          TEXT NOT NULL,
    updated_at    TEXT NOT NULL
);

-- NULL columns inherit from global_config.
CREATE TABLE IF NOT EXISTS subject_config (
    subject       TEXT PRIMARY KEY,
    compatibility TEXT,
    mode          TEXT,
    alias         TEXT,
    normalize     INTEGER NOT NULL DEFAULT 0,
    updated_at    TEXT    NOT NULL
);

CREATE INDEX IF NOT EXISTS subject_versions_schema_idx ON subject_versions(schema_id);
CREATE INDEX IF NOT EXISTS schema_references_target_idx
    ON schema_references(referenced_subject, referenced_version);

PRAGMA user_version = 1;
";
