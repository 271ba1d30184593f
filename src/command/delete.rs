/// delete command
use crate::command::{append_passthrough, command_head, merge_reserved, Document, Namespace, Renderable, WriteConcern};
use crate::error::{RutaError, RutaResult};
use serde_json::Value;

const COMMAND: &str = "delete";

/// A single `{q, limit}` entry; limit 1 removes one match, 0 removes all
#[derive(Debug, Clone, PartialEq)]
pub struct DeleteStatement {
    filter: Document,
    limit: u32,
    pub collation: Option<Document>,
    pub hint: Option<Value>,
    pub extra: Document,
}

impl DeleteStatement {
    fn with_limit(filter: Document, limit: u32) -> Self {
        Self {
            filter,
            limit,
            collation: None,
            hint: None,
            extra: Document::new(),
        }
    }

    pub fn delete_one(filter: Document) -> Self {
        Self::with_limit(filter, 1)
    }

    pub fn delete_many(filter: Document) -> Self {
        Self::with_limit(filter, 0)
    }

    pub fn collation(mut self, collation: Document) -> Self {
        self.collation = Some(collation);
        self
    }

    fn render(&self) -> Value {
        let mut options = Document::new();
        if let Some(collation) = &self.collation {
            options.insert("collation".to_string(), Value::Object(collation.clone()));
        }
        if let Some(hint) = &self.hint {
            options.insert("hint".to_string(), hint.clone());
        }
        append_passthrough(&mut options, &self.extra);

        Value::Object(merge_reserved(
            options,
            vec![
                ("q", Value::Object(self.filter.clone())),
                ("limit", Value::from(self.limit)),
            ],
        ))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Delete {
    pub namespace: Namespace,
    pub deletes: Vec<DeleteStatement>,
    pub ordered: bool,
    pub write_concern: Option<WriteConcern>,
    pub extra: Document,
}

impl Delete {
    pub fn new(namespace: Namespace, deletes: Vec<DeleteStatement>) -> Self {
        Self {
            namespace,
            deletes,
            ordered: true,
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

impl Renderable for Delete {
    fn command_name(&self) -> &'static str {
        COMMAND
    }

    fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    fn render(&self) -> RutaResult<Document> {
        if self.deletes.is_empty() {
            return Err(RutaError::missing_field(COMMAND, "deletes"));
        }

        let mut doc = command_head(COMMAND, &self.namespace);
        doc.insert(
            "deletes".to_string(),
            Value::Array(self.deletes.iter().map(DeleteStatement::render).collect()),
        );
        doc.insert("ordered".to_string(), Value::Bool(self.ordered));
        if let Some(concern) = &self.write_concern {
            doc.insert("writeConcern".to_string(), Value::Object(concern.to_document()));
        }
        append_passthrough(&mut doc, &self.extra);
        Ok(doc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::test_support::doc;
    use serde_json::json;

    fn ns() -> Namespace {
        "test.people".parse().unwrap()
    }

    #[test]
    fn test_delete_one_and_many() {
        let command = Delete::new(
            ns(),
            vec![
                DeleteStatement::delete_one(doc(json!({ "field": "test1" }))),
                DeleteStatement::delete_many(Document::new()).collation(doc(json!({ "locale": "en" }))),
            ],
        )
        .ordered(false)
        .write_concern(WriteConcern::majority());

        assert_eq!(
            Value::Object(command.render().unwrap()),
            json!({
                "delete": "people",
                "deletes": [
                    { "q": { "field": "test1" }, "limit": 1 },
                    { "collation": { "locale": "en" }, "q": {}, "limit": 0 }
                ],
                "ordered": false,
                "writeConcern": { "w": "majority" }
            })
        );
    }

    #[test]
    fn test_statement_extras_cannot_change_limit() {
        let mut statement = DeleteStatement::delete_one(doc(json!({ "a": 1 })));
        statement.extra = doc(json!({ "limit": 0 }));
        let rendered = Value::Object(Delete::new(ns(), vec![statement]).render().unwrap());
        assert_eq!(rendered["deletes"][0], json!({ "q": { "a": 1 }, "limit": 1 }));
    }

    #[test]
    fn test_delete_requires_statements() {
        let err = Delete::new(ns(), vec![]).render().unwrap_err();
        assert!(err.to_string().contains("'deletes'"));
    }
}
