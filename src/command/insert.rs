/// insert command
use crate::command::{append_passthrough, command_head, has_operator_keys, Document, Namespace, Renderable, WriteConcern};
use crate::error::{RutaError, RutaResult};
use serde_json::Value;

const COMMAND: &str = "insert";

#[derive(Debug, Clone, PartialEq)]
pub struct Insert {
    pub namespace: Namespace,
    pub documents: Vec<Document>,
    /// Stop at the first failed document; on by default
    pub ordered: bool,
    pub bypass_document_validation: Option<bool>,
    pub write_concern: Option<WriteConcern>,
    pub extra: Document,
}

impl Insert {
    pub fn new(namespace: Namespace, documents: Vec<Document>) -> Self {
        Self {
            namespace,
            documents,
            ordered: true,
            bypass_document_validation: None,
            write_concern: None,
            extra: Document::new(),
        }
    }

    pub fn one(namespace: Namespace, document: Document) -> Self {
        Self::new(namespace, vec![document])
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

impl Renderable for Insert {
    fn command_name(&self) -> &'static str {
        COMMAND
    }

    fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    fn render(&self) -> RutaResult<Document> {
        if self.documents.is_empty() {
            return Err(RutaError::missing_field(COMMAND, "documents"));
        }
        if let Some(position) = self.documents.iter().position(has_operator_keys) {
            return Err(RutaError::command(
                COMMAND,
                format!("document {} has a top-level key starting with '$'", position),
            ));
        }

        let mut doc = command_head(COMMAND, &self.namespace);
        doc.insert(
            "documents".to_string(),
            Value::Array(self.documents.iter().cloned().map(Value::Object).collect()),
        );
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
