//! Query definitions.
//!
//! A `QuerySource` is one definition file held as raw bytes: the bytes are
//! both parsed into a `QueryDefinition` (through the declarative schema)
//! and hashed for versioning, so the two can never disagree.

pub mod files;
pub mod schema;

use anyhow::{Context, Result};
use std::path::Path;
use tracing::warn;

use crate::types::{FetchBackend, QueryDefinition, ResultType, TrackerError};
use schema::{FieldKind, FieldValue, Schema, SchemaError};

/// Field names as they appear in definition files.
pub mod keys {
    pub const URL: &str = "url";
    pub const BEFORE: &str = "before";
    pub const AFTER: &str = "after";
    pub const ANY_TAG: &str = "any_tag";
    pub const RESULT_TYPE: &str = "result_type";
    pub const REQUEST_BACKEND: &str = "request_backend";
    pub const REQUEST_INTERVAL_SECONDS: &str = "request_interval_seconds";
    pub const ONLY_IF_DIFFERENT: &str = "only_if_different";
    pub const ONLY_IF_UNIQUE: &str = "only_if_unique";
}

fn non_empty(v: &FieldValue) -> Result<(), String> {
    match v {
        FieldValue::String(s) if s.trim().is_empty() => Err("must not be empty".into()),
        _ => Ok(()),
    }
}

fn non_negative(v: &FieldValue) -> Result<(), String> {
    match v {
        FieldValue::Int(i) if *i < 0 => Err(format!("{i} is negative")),
        _ => Ok(()),
    }
}

fn result_type(v: &FieldValue) -> Result<(), String> {
    match v {
        FieldValue::String(s) => s.parse::<ResultType>().map(|_| ()).map_err(|e| e.to_string()),
        _ => Ok(()),
    }
}

fn request_backend(v: &FieldValue) -> Result<(), String> {
    match v {
        FieldValue::String(s) => s.parse::<FetchBackend>().map(|_| ()).map_err(|e| e.to_string()),
        _ => Ok(()),
    }
}

/// The schema every query definition file is resolved against.
pub fn query_schema() -> Schema {
    Schema::builder()
        .required(keys::URL, FieldKind::String)
        .validate(non_empty)
        .required(keys::BEFORE, FieldKind::String)
        .required(keys::AFTER, FieldKind::String)
        .optional(keys::ANY_TAG, FieldValue::String("<any>".into()))
        .optional(keys::RESULT_TYPE, FieldValue::String("string".into()))
        .validate(result_type)
        .optional(keys::REQUEST_BACKEND, FieldValue::String("plain".into()))
        .validate(request_backend)
        .optional(keys::REQUEST_INTERVAL_SECONDS, FieldValue::Int(1))
        .validate(non_negative)
        .optional(keys::ONLY_IF_DIFFERENT, FieldValue::Bool(false))
        .optional(keys::ONLY_IF_UNIQUE, FieldValue::Bool(false))
        .build()
}

/// One definition source: its derived name and raw contents.
#[derive(Debug, Clone)]
pub struct QuerySource {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl QuerySource {
    /// Read a definition file; the name is the file stem.
    pub fn from_path(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read query {}", path.display()))?;
        Ok(Self {
            name: files::name_from_path(path),
            bytes,
        })
    }

    pub fn from_bytes(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }

    /// SHA-256 of the raw bytes. Any byte change is a new version.
    pub fn content_hash(&self) -> String {
        files::hash_bytes(&self.bytes)
    }

    /// Parse and validate the definition. The version is left at 0 for
    /// the resolver to assign.
    pub fn load(&self) -> Result<QueryDefinition, TrackerError> {
        let config_err = |e: SchemaError| TrackerError::Config(format!("query {}: {e}", self.name));

        let text = std::str::from_utf8(&self.bytes)
            .map_err(|e| config_err(SchemaError::Syntax(e.to_string())))?;
        let table = text
            .parse::<toml::Table>()
            .map_err(|e| config_err(SchemaError::Syntax(e.to_string())))?;

        let schema = query_schema();
        for key in schema.unknown_keys(&table) {
            warn!(query = %self.name, key, "Ignoring unknown key in query definition");
        }
        let fields = schema.resolve(&table).map_err(config_err)?;

        let result_type = fields
            .string(keys::RESULT_TYPE)
            .map_err(config_err)?
            .parse::<ResultType>()?;
        let fetch_backend = fields
            .string(keys::REQUEST_BACKEND)
            .map_err(config_err)?
            .parse::<FetchBackend>()?;
        let interval = fields.int(keys::REQUEST_INTERVAL_SECONDS).map_err(config_err)?;

        Ok(QueryDefinition {
            name: self.name.clone(),
            url: fields.string(keys::URL).map_err(config_err)?.to_string(),
            before: fields.string(keys::BEFORE).map_err(config_err)?.to_string(),
            after: fields.string(keys::AFTER).map_err(config_err)?.to_string(),
            any_tag: fields.string(keys::ANY_TAG).map_err(config_err)?.to_string(),
            result_type,
            fetch_backend,
            interval_seconds: u64::try_from(interval).unwrap_or(0),
            only_if_different: fields.bool(keys::ONLY_IF_DIFFERENT).map_err(config_err)?,
            only_if_unique: fields.bool(keys::ONLY_IF_UNIQUE).map_err(config_err)?,
            version: 0,
        })
    }
}
