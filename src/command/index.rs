/// createIndexes command
use crate::command::{append_passthrough, command_head, merge_reserved, Document, Namespace, Renderable, WriteConcern};
use crate::error::{RutaError, RutaResult};
use serde_json::Value;
use std::time::Duration;

const COMMAND: &str = "createIndexes";

/// Index options with typed fields for the common ones
///
/// Anything else goes into `extra` and is passed through unchanged unless it
/// collides with a typed field or a reserved key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndexOptions {
    pub unique: Option<bool>,
    pub sparse: Option<bool>,
    pub background: Option<bool>,
    /// TTL in whole seconds; fractional seconds are rejected at render time
    pub expire_after: Option<Duration>,
    pub partial_filter_expression: Option<Document>,
    pub hidden: Option<bool>,
    pub extra: Document,
}

impl IndexOptions {
    pub fn unique() -> Self {
        Self {
            unique: Some(true),
            ..Self::default()
        }
    }

    pub fn to_document(&self) -> Document {
        let mut doc = Document::new();
        if let Some(unique) = self.unique {
            doc.insert("unique".to_string(), Value::Bool(unique));
        }
        if let Some(sparse) = self.sparse {
            doc.insert("sparse".to_string(), Value::Bool(sparse));
        }
        if let Some(background) = self.background {
            doc.insert("background".to_string(), Value::Bool(background));
        }
        if let Some(expire_after) = self.expire_after {
            doc.insert("expireAfterSeconds".to_string(), Value::from(expire_after.as_secs()));
        }
        if let Some(filter) = &self.partial_filter_expression {
            doc.insert("partialFilterExpression".to_string(), Value::Object(filter.clone()));
        }
        if let Some(hidden) = self.hidden {
            doc.insert("hidden".to_string(), Value::Bool(hidden));
        }
        append_passthrough(&mut doc, &self.extra);
        doc
    }
}

/// One index to create
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndexModel {
    pub key: Document,
    pub name: Option<String>,
    pub options: IndexOptions,
}

impl IndexModel {
    pub fn new(key: Document, name: impl Into<String>) -> Self {
        Self {
            key,
            name: Some(name.into()),
            options: IndexOptions::default(),
        }
    }

    /// Index named by the server's naming convention for `key`
    pub fn with_generated_name(key: Document) -> Self {
        let name = index_name_for(&key);
        Self::new(key, name)
    }

    pub fn options(mut self, options: IndexOptions) -> Self {
        self.options = options;
        self
    }

    fn render(&self) -> RutaResult<Value> {
        if self.key.is_empty() {
            return Err(RutaError::missing_field(COMMAND, "key"));
        }
        for (field, direction) in &self.key {
            if !matches!(direction, Value::Number(_) | Value::String(_)) {
                return Err(RutaError::command(
                    COMMAND,
                    format!("index key '{}' must be a number or an index type, got {}", field, direction),
                ));
            }
        }
        let name = match self.name.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ => return Err(RutaError::missing_field(COMMAND, "name")),
        };
        if let Some(ttl) = self.options.expire_after {
            if ttl.subsec_nanos() != 0 {
                return Err(RutaError::command(
                    COMMAND,
                    format!("expireAfterSeconds must be whole seconds, got {:?}", ttl),
                ));
            }
        }

        let model = merge_reserved(
            self.options.to_document(),
            vec![
                ("key", Value::Object(self.key.clone())),
                ("name", Value::String(name.to_string())),
            ],
        );
        Ok(Value::Object(model))
    }
}

/// Conventional index name: `field_direction` pairs joined by `_`
pub fn index_name_for(key: &Document) -> String {
    key.iter()
        .map(|(field, direction)| {
            let direction = match direction {
                Value::Number(n) => n.as_i64().map(|i| i.to_string()).unwrap_or_else(|| n.to_string()),
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            format!("{}_{}", field, direction)
        })
        .collect::<Vec<_>>()
        .join("_")
}

/// createIndexes over one or more index models
#[derive(Debug, Clone, PartialEq)]
pub struct CreateIndexes {
    pub namespace: Namespace,
    pub indexes: Vec<IndexModel>,
    pub write_concern: Option<WriteConcern>,
    pub extra: Document,
}

impl CreateIndexes {
    pub fn new(namespace: Namespace, indexes: Vec<IndexModel>) -> Self {
        Self {
            namespace,
            indexes,
            write_concern: None,
            extra: Document::new(),
        }
    }

    /// The common single-index case
    pub fn single(namespace: Namespace, key: Document, name: impl Into<String>, options: IndexOptions) -> Self {
        Self::new(namespace, vec![IndexModel::new(key, name).options(options)])
    }

    pub fn write_concern(mut self, write_concern: WriteConcern) -> Self {
        self.write_concern = Some(write_concern);
        self
    }
}

impl Renderable for CreateIndexes {
    fn command_name(&self) -> &'static str {
        COMMAND
    }

    fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    fn render(&self) -> RutaResult<Document> {
        if self.indexes.is_empty() {
            return Err(RutaError::missing_field(COMMAND, "indexes"));
        }

        let indexes = self
            .indexes
            .iter()
            .map(IndexModel::render)
            .collect::<RutaResult<Vec<_>>>()?;

        let mut doc = command_head(COMMAND, &self.namespace);
        doc.insert("indexes".to_string(), Value::Array(indexes));
        if let Some(concern) = &self.write_concern {
            doc.insert("writeConcern".to_string(), Value::Object(concern.to_document()));
        }
        append_passthrough(&mut doc, &self.extra);
        Ok(doc)
    }
}
