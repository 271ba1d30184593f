/// Command document builder
///
/// Each operation kind is a small value type implementing [`Renderable`]; the
/// rendered document is created fresh per call and owned by the caller.
///
/// Caller-supplied options never overwrite protocol-reserved keys. Per-item
/// payloads (index specs, update and delete statements) take caller options
/// first and reserved keys on top. Top-level documents start with the command
/// verb and append passthrough keys only where no key exists yet.
pub mod delete;
pub mod find_and_modify;
pub mod index;
pub mod insert;
pub mod update;

pub use delete::{Delete, DeleteStatement};
pub use find_and_modify::{FindAndModify, ReturnDocument};
pub use index::{index_name_for, CreateIndexes, IndexModel, IndexOptions};
pub use insert::Insert;
pub use update::{Update, UpdateStatement};

use crate::error::{RutaError, RutaResult};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Wire-level command document; key order is preserved
pub type Document = Map<String, Value>;

/// Capability of an operation intent to render itself as a command document
pub trait Renderable {
    /// Command verb; always the first key of the rendered document
    fn command_name(&self) -> &'static str;

    fn namespace(&self) -> &Namespace;

    fn render(&self) -> RutaResult<Document>;
}

/// Target database and collection
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Namespace {
    database: String,
    collection: String,
}

impl Namespace {
    pub fn new<D: Into<String>, C: Into<String>>(database: D, collection: C) -> RutaResult<Self> {
        let database = database.into();
        let collection = collection.into();

        if database.is_empty() {
            return Err(RutaError::missing_field("namespace", "database"));
        }
        if database.contains('.') {
            return Err(RutaError::command(
                "namespace",
                format!("database name '{}' must not contain '.'", database),
            ));
        }
        if collection.is_empty() {
            return Err(RutaError::missing_field("namespace", "collection"));
        }

        Ok(Self {
            database,
            collection,
        })
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }
}

impl FromStr for Namespace {
    type Err = RutaError;

    /// `db.coll`; everything after the first dot is the collection
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (database, collection) = s.split_once('.').ok_or_else(|| {
            RutaError::command("namespace", format!("expected 'database.collection', got '{}'", s))
        })?;
        Namespace::new(database, collection)
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.database, self.collection)
    }
}

/// Acknowledgment requested by a write concern
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Acknowledgment {
    Nodes(u32),
    Majority,
    Tag(String),
}

/// Write concern attached to write commands
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteConcern {
    pub w: Option<Acknowledgment>,
    pub journal: Option<bool>,
    /// Sent as whole milliseconds; any sub-millisecond part is dropped
    pub w_timeout: Option<Duration>,
}

impl WriteConcern {
    pub fn majority() -> Self {
        Self {
            w: Some(Acknowledgment::Majority),
            ..Self::default()
        }
    }

    pub fn nodes(count: u32) -> Self {
        Self {
            w: Some(Acknowledgment::Nodes(count)),
            ..Self::default()
        }
    }

    pub fn to_document(&self) -> Document {
        let mut doc = Document::new();
        match &self.w {
            Some(Acknowledgment::Nodes(n)) => {
                doc.insert("w".to_string(), Value::from(*n));
            }
            Some(Acknowledgment::Majority) => {
                doc.insert("w".to_string(), Value::from("majority"));
            }
            Some(Acknowledgment::Tag(tag)) => {
                doc.insert("w".to_string(), Value::from(tag.as_str()));
            }
            None => {}
        }
        if let Some(journal) = self.journal {
            doc.insert("j".to_string(), Value::Bool(journal));
        }
        if let Some(timeout) = self.w_timeout {
            doc.insert("wtimeout".to_string(), Value::from(timeout.as_millis() as u64));
        }
        doc
    }
}

/// Any operation intent the builder knows how to render
#[derive(Debug, Clone, PartialEq)]
pub enum CommandIntent {
    CreateIndexes(CreateIndexes),
    Insert(Insert),
    Update(Update),
    Delete(Delete),
    FindAndModify(FindAndModify),
}

impl CommandIntent {
    fn inner(&self) -> &dyn Renderable {
        match self {
            CommandIntent::CreateIndexes(c) => c,
            CommandIntent::Insert(c) => c,
            CommandIntent::Update(c) => c,
            CommandIntent::Delete(c) => c,
            CommandIntent::FindAndModify(c) => c,
        }
    }
}

impl Renderable for CommandIntent {
    fn command_name(&self) -> &'static str {
        self.inner().command_name()
    }

    fn namespace(&self) -> &Namespace {
        self.inner().namespace()
    }

    fn render(&self) -> RutaResult<Document> {
        let doc = self.inner().render()?;
        log::debug!("Rendered {} command for {}", self.command_name(), self.namespace());
        Ok(doc)
    }
}

/// Per-item payload: caller options first, reserved entries applied on top
pub(crate) fn merge_reserved(options: Document, reserved: Vec<(&str, Value)>) -> Document {
    let mut doc = Document::new();
    for (key, value) in options {
        if reserved.iter().any(|(name, _)| *name == key) {
            continue;
        }
        doc.insert(key, value);
    }
    for (key, value) in reserved {
        doc.insert(key.to_string(), value);
    }
    doc
}

/// Top-level passthrough: only keys the command does not already carry
pub(crate) fn append_passthrough(doc: &mut Document, extra: &Document) {
    for (key, value) in extra {
        if !doc.contains_key(key) {
            doc.insert(key.clone(), value.clone());
        }
    }
}

/// Start a command document with its verb and collection
pub(crate) fn command_head(verb: &str, namespace: &Namespace) -> Document {
    let mut doc = Document::new();
    doc.insert(verb.to_string(), Value::String(namespace.collection().to_string()));
    doc
}

pub(crate) fn has_operator_keys(doc: &Document) -> bool {
    doc.keys().any(|k| k.starts_with('$'))
}

/// Update documents must consist solely of `$` operators
pub(crate) fn check_update_document(command: &str, update: &Document) -> RutaResult<()> {
    if update.is_empty() {
        return Err(RutaError::missing_field(command, "update"));
    }
    if !update.keys().all(|k| k.starts_with('$')) {
        return Err(RutaError::command(
            command,
            "update document must contain only atomic operators",
        ));
    }
    Ok(())
}

/// Replacement documents must not contain `$` operators
pub(crate) fn check_replacement_document(command: &str, replacement: &Document) -> RutaResult<()> {
    if has_operator_keys(replacement) {
        return Err(RutaError::command(
            command,
            "replacement document must not contain atomic operators",
        ));
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::Document;
    use serde_json::Value;

    pub fn doc(value: Value) -> Document {
        match value {
            Value::Object(map) => map,
            other => panic!("expected a JSON object, got {}", other),
        }
    }
}
