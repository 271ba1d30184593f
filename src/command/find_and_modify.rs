/// findAndModify command behind find_one_and_{delete,replace,update}
use crate::command::{
    append_passthrough, check_replacement_document, check_update_document, command_head, Document, Namespace,
    Renderable, WriteConcern,
};
use crate::error::{RutaError, RutaResult};
use serde_json::Value;

const COMMAND: &str = "findAndModify";

/// Keys owned by the typed fields whether or not a variant writes them
const RESERVED: [&str; 7] = ["query", "sort", "fields", "remove", "update", "new", "upsert"];

/// Which version of the document the server returns
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReturnDocument {
    #[default]
    Before,
    After,
}

#[derive(Debug, Clone, PartialEq)]
enum Action {
    Remove,
    Update(Document),
    Replace(Document),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FindAndModify {
    pub namespace: Namespace,
    query: Document,
    action: Action,
    pub sort: Option<Document>,
    pub projection: Option<Document>,
    pub upsert: Option<bool>,
    pub return_document: ReturnDocument,
    pub write_concern: Option<WriteConcern>,
    pub extra: Document,
}

impl FindAndModify {
    fn with_action(namespace: Namespace, query: Document, action: Action) -> Self {
        Self {
            namespace,
            query,
            action,
            sort: None,
            projection: None,
            upsert: None,
            return_document: ReturnDocument::default(),
            write_concern: None,
            extra: Document::new(),
        }
    }

    pub fn find_one_and_delete(namespace: Namespace, filter: Document) -> Self {
        Self::with_action(namespace, filter, Action::Remove)
    }

    pub fn find_one_and_replace(namespace: Namespace, filter: Document, replacement: Document) -> Self {
        Self::with_action(namespace, filter, Action::Replace(replacement))
    }

    pub fn find_one_and_update(namespace: Namespace, filter: Document, update: Document) -> Self {
        Self::with_action(namespace, filter, Action::Update(update))
    }

    pub fn sort(mut self, sort: Document) -> Self {
        self.sort = Some(sort);
        self
    }

    pub fn projection(mut self, projection: Document) -> Self {
        self.projection = Some(projection);
        self
    }

    pub fn upsert(mut self, upsert: bool) -> Self {
        self.upsert = Some(upsert);
        self
    }

    pub fn return_document(mut self, return_document: ReturnDocument) -> Self {
        self.return_document = return_document;
        self
    }
}

impl Renderable for FindAndModify {
    fn command_name(&self) -> &'static str {
        COMMAND
    }

    fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    fn render(&self) -> RutaResult<Document> {
        let mut doc = command_head(COMMAND, &self.namespace);
        doc.insert("query".to_string(), Value::Object(self.query.clone()));
        if let Some(sort) = &self.sort {
            doc.insert("sort".to_string(), Value::Object(sort.clone()));
        }
        if let Some(projection) = &self.projection {
            doc.insert("fields".to_string(), Value::Object(projection.clone()));
        }

        match &self.action {
            Action::Remove => {
                if self.upsert.is_some() {
                    return Err(RutaError::command(COMMAND, "upsert cannot be combined with remove"));
                }
                doc.insert("remove".to_string(), Value::Bool(true));
            }
            Action::Update(update) | Action::Replace(update) => {
                if matches!(self.action, Action::Update(_)) {
                    check_update_document(COMMAND, update)?;
                } else {
                    check_replacement_document(COMMAND, update)?;
                }
                doc.insert("update".to_string(), Value::Object(update.clone()));
                doc.insert(
                    "new".to_string(),
                    Value::Bool(self.return_document == ReturnDocument::After),
                );
                if let Some(upsert) = self.upsert {
                    doc.insert("upsert".to_string(), Value::Bool(upsert));
                }
            }
        }

        if let Some(concern) = &self.write_concern {
            doc.insert("writeConcern".to_string(), Value::Object(concern.to_document()));
        }
        let extra: Document = self
            .extra
            .iter()
            .filter(|(key, _)| !RESERVED.contains(&key.as_str()))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        append_passthrough(&mut doc, &extra);
        Ok(doc)
    }
}
