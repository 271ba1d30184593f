/// update command: update_one, update_many and replace_one statements
use crate::command::{
    append_passthrough, check_replacement_document, check_update_document, command_head, merge_reserved, Document,
    Namespace, Renderable, WriteConcern,
};
use crate::error::{RutaError, RutaResult};
use serde_json::Value;

const COMMAND: &str = "update";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UpdateKind {
    One,
    Many,
    Replace,
}

/// A single `{q, u, multi, ...}` entry
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateStatement {
    filter: Document,
    modification: Document,
    kind: UpdateKind,
    pub upsert: Option<bool>,
    pub array_filters: Option<Vec<Document>>,
    pub collation: Option<Document>,
    pub extra: Document,
}

impl UpdateStatement {
    fn with_kind(filter: Document, modification: Document, kind: UpdateKind) -> Self {
        Self {
            filter,
            modification,
            kind,
            upsert: None,
            array_filters: None,
            collation: None,
            extra: Document::new(),
        }
    }

    /// Apply operators to the first matching document
    pub fn update_one(filter: Document, update: Document) -> Self {
        Self::with_kind(filter, update, UpdateKind::One)
    }

    /// Apply operators to every matching document
    pub fn update_many(filter: Document, update: Document) -> Self {
        Self::with_kind(filter, update, UpdateKind::Many)
    }

    /// Replace the first matching document wholesale
    pub fn replace_one(filter: Document, replacement: Document) -> Self {
        Self::with_kind(filter, replacement, UpdateKind::Replace)
    }

    pub fn upsert(mut self, upsert: bool) -> Self {
        self.upsert = Some(upsert);
        self
    }

    pub fn array_filters(mut self, filters: Vec<Document>) -> Self {
        self.array_filters = Some(filters);
        self
    }

    pub fn is_multi(&self) -> bool {
        self.kind == UpdateKind::Many
    }

    fn render(&self) -> RutaResult<Value> {
        match self.kind {
            UpdateKind::One | UpdateKind::Many => check_update_document(COMMAND, &self.modification)?,
            UpdateKind::Replace => check_replacement_document(COMMAND, &self.modification)?,
        }
        if self.kind == UpdateKind::Replace && self.array_filters.is_some() {
            return Err(RutaError::command(COMMAND, "arrayFilters cannot be used with a replacement"));
        }

        let mut options = Document::new();
        if let Some(upsert) = self.upsert {
            options.insert("upsert".to_string(), Value::Bool(upsert));
        }
        if let Some(filters) = &self.array_filters {
            options.insert(
                "arrayFilters".to_string(),
                Value::Array(filters.iter().cloned().map(Value::Object).collect()),
            );
        }
        if let Some(collation) = &self.collation {
            options.insert("collation".to_string(), Value::Object(collation.clone()));
        }
        append_passthrough(&mut options, &self.extra);

        Ok(Value::Object(merge_reserved(
            options,
            vec![
                ("q", Value::Object(self.filter.clone())),
                ("u", Value::Object(self.modification.clone())),
                ("multi", Value::Bool(self.is_multi())),
            ],
        )))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Update {
    pub namespace: Namespace,
    pub updates: Vec<UpdateStatement>,
    pub ordered: bool,
    pub bypass_document_validation: Option<bool>,
    pub write_concern: Option<WriteConcern>,
    pub extra: Document,
}

impl Update {
    pub fn new(namespace: Namespace, updates: Vec<UpdateStatement>) -> Self {
        Self {
            namespace,
            updates,
            ordered: true,
            bypass_document_validation: None,
            write_concern: None,
            extra: Document::new(),
        }
    }

    pub fn ordered(mut self, ordered: bool) -> Self {
        self.ordered = ordered;
        self
    }

    pub fn write_concern(mut self, write_concern: WriteConcern) -> Self {
        self.write_concern = Some(write_concern);
        self
    }
}

impl Renderable for Update {
    fn command_name(&self) -> &'static str {
        COMMAND
    }

    fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    fn render(&self) -> RutaResult<Document> {
        if self.updates.is_empty() {
            return Err(RutaError::missing_field(COMMAND, "updates"));
        }

        let updates = self
            .updates
            .iter()
            .map(UpdateStatement::render)
            .collect::<RutaResult<Vec<_>>>()?;

        let mut doc = command_head(COMMAND, &self.namespace);
        doc.insert("updates".to_string(), Value::Array(updates));
        doc.insert("ordered".to_string(), Value::Bool(self.ordered));
        if let Some(bypass) = self.bypass_document_validation {
            doc.insert("bypassDocumentValidation".to_string(), Value::Bool(bypass));
        }
        if let Some(concern) = &self.write_concern {
            doc.insert("writeConcern".to_string(), Value::Object(concern.to_document()));
        }
        append_passthrough(&mut doc, &self.extra);
        Ok(doc)
    }
}
