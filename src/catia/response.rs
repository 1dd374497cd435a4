//! Shaping of automation records into tool results.

use serde_json::{json, Value};

use crate::catia::error::{CatiaError, CatiaResult};
use crate::catia::operation::Operation;
use crate::catia::Record;

/// What a tool hands back to the client.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutput {
    /// A one-line human-readable message.
    Message(String),
    /// Structured data, rendered as pretty JSON.
    Data(Value),
}

impl ToolOutput {
    /// Renders the output as the text of an MCP content item.
    #[must_use]
    pub fn into_text(self) -> String {
        match self {
            Self::Message(text) => text,
            Self::Data(value) => {
                serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string())
            }
        }
    }
}

/// Message returned when no document is open.
pub const NO_OPEN_DOCUMENTS: &str = "No documents are currently open";

/// Converts the records produced by an operation into its tool output.
///
/// # Errors
///
/// Returns [`CatiaError::MalformedOutput`] if a record the operation must
/// produce is missing or lacks a field.
pub fn shape(op: &Operation, records: &[Record]) -> CatiaResult<ToolOutput> {
    let output = match op {
        Operation::GetInfo => {
            let r = first(records)?;
            ToolOutput::Data(json!({
                "version": number_or_text(field(r, "version")?),
                "release": number_or_text(field(r, "release")?),
                "service_pack": number_or_text(field(r, "service_pack")?),
                "visible": flag(r, "visible")?,
                "caption": field(r, "caption")?,
                "full_name": field(r, "full_name")?,
            }))
        }
        Operation::ListDocuments => {
            let documents = records
                .iter()
                .map(|r| {
                    let name = field(r, "name")?;
                    Ok(json!({
                        "name": name,
                        "full_name": field(r, "full_name")?,
                        "type": document_type(name),
                    }))
                })
                .collect::<CatiaResult<Vec<_>>>()?;
            ToolOutput::Data(Value::Array(documents))
        }
        Operation::GetActiveDocument => {
            let Some(r) = records.first() else {
                return Ok(ToolOutput::Message(NO_OPEN_DOCUMENTS.to_string()));
            };
            let path = r
                .get("path")
                .map(String::as_str)
                .filter(|p| !p.is_empty())
                .unwrap_or("Not saved");
            ToolOutput::Data(json!({
                "name": field(r, "name")?,
                "full_name": field(r, "full_name")?,
                "path": path,
                "saved": flag(r, "saved")?,
            }))
        }
        Operation::CreateDocument { kind, name } => ToolOutput::Message(format!(
            "Created new {} document: {name}",
            kind.as_str()
        )),
        Operation::OpenDocument { .. } => {
            let name = field(first(records)?, "name")?;
            ToolOutput::Message(format!("Opened document: {name}"))
        }
        Operation::SaveDocument { file_path } => match file_path {
            Some(path) => ToolOutput::Message(format!("Document saved to: {path}")),
            None => {
                let name = field(first(records)?, "name")?;
                ToolOutput::Message(format!("Document saved: {name}"))
            }
        },
        Operation::CloseDocument { document_name } => {
            if flag(first(records)?, "found")? {
                ToolOutput::Message(format!("Closed document: {document_name}"))
            } else {
                ToolOutput::Message(format!("Document not found: {document_name}"))
            }
        }
        Operation::CreateSketch { plane, name } => {
            let mut message = format!("Created sketch on {} plane", plane.as_str());
            if let Some(name) = name {
                message.push_str(&format!(" with name {name}"));
            }
            ToolOutput::Message(message)
        }
        Operation::CreatePad { length } => {
            ToolOutput::Message(format!("Created pad with length {length} mm"))
        }
        Operation::CreatePocket { depth } => {
            ToolOutput::Message(format!("Created pocket with depth {depth} mm"))
        }
        Operation::GetPartBodies => {
            let bodies = records
                .iter()
                .map(|r| Ok(json!({ "name": field(r, "name")? })))
                .collect::<CatiaResult<Vec<_>>>()?;
            ToolOutput::Data(Value::Array(bodies))
        }
        Operation::UpdatePart => ToolOutput::Message("Part updated successfully".to_string()),
        Operation::CreateRectangle(rect) => {
            let (bottom_left, top_right) = rect.corners();
            ToolOutput::Data(json!({
                "message": format!(
                    "Created rectangle at ({}, {}) with width={}mm, height={}mm",
                    rect.x, rect.y, rect.width, rect.height
                ),
                "centered": rect.centered,
                "corners": {
                    "bottom_left": bottom_left,
                    "top_right": top_right,
                },
            }))
        }
        Operation::ExecuteMacro { function_name, .. } => {
            ToolOutput::Message(format!("Executed macro: {function_name}"))
        }
    };
    Ok(output)
}

/// Extension of a document name, or the whole name when it has none.
fn document_type(name: &str) -> &str {
    name.rsplit('.').next().unwrap_or(name)
}

fn first(records: &[Record]) -> CatiaResult<&Record> {
    records
        .first()
        .ok_or_else(|| CatiaError::malformed("expected a result record, got none"))
}

fn field<'a>(record: &'a Record, key: &str) -> CatiaResult<&'a str> {
    record
        .get(key)
        .map(String::as_str)
        .ok_or_else(|| CatiaError::malformed(format!("missing field '{key}'")))
}

fn flag(record: &Record, key: &str) -> CatiaResult<bool> {
    match field(record, key)? {
        "true" => Ok(true),
        "false" => Ok(false),
        other => Err(CatiaError::malformed(format!(
            "field '{key}' is not a boolean: {other}"
        ))),
    }
}

fn number_or_text(value: &str) -> Value {
    value
        .parse::<i64>()
        .map_or_else(|_| Value::String(value.to_string()), Value::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catia::operation::{DocumentKind, Plane, Rectangle};

    fn record(pairs: &[(&str, &str)]) -> Record {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn info_fields() {
        let records = vec![record(&[
            ("version", "5"),
            ("release", "28"),
            ("service_pack", "3"),
            ("visible", "true"),
            ("caption", "CATIA V5"),
            ("full_name", r"C:\CATIA\CNEXT.exe"),
        ])];
        let ToolOutput::Data(value) = shape(&Operation::GetInfo, &records).unwrap() else {
            panic!("expected data");
        };
        assert_eq!(value["version"], 5);
        assert_eq!(value["release"], 28);
        assert_eq!(value["visible"], true);
        assert_eq!(value["caption"], "CATIA V5");
    }

    #[test]
    fn document_types_from_names() {
        let records = vec![
            record(&[("name", "Part1.CATPart"), ("full_name", "Part1.CATPart")]),
            record(&[("name", "Assembly.v2.CATProduct"), ("full_name", "x")]),
            record(&[("name", "README"), ("full_name", "README")]),
        ];
        let ToolOutput::Data(value) = shape(&Operation::ListDocuments, &records).unwrap() else {
            panic!("expected data");
        };
        assert_eq!(value[0]["type"], "CATPart");
        assert_eq!(value[1]["type"], "CATProduct");
        assert_eq!(value[2]["type"], "README");
    }

    #[test]
    fn empty_document_list() {
        let output = shape(&Operation::ListDocuments, &[]).unwrap();
        assert_eq!(output, ToolOutput::Data(json!([])));
    }

    #[test]
    fn no_active_document() {
        let output = shape(&Operation::GetActiveDocument, &[]).unwrap();
        assert_eq!(output, ToolOutput::Message(NO_OPEN_DOCUMENTS.to_string()));
    }

    #[test]
    fn unsaved_active_document() {
        let records = vec![record(&[
            ("name", "Part1.CATPart"),
            ("full_name", "Part1.CATPart"),
            ("path", ""),
            ("saved", "false"),
        ])];
        let ToolOutput::Data(value) = shape(&Operation::GetActiveDocument, &records).unwrap()
        else {
            panic!("expected data");
        };
        assert_eq!(value["path"], "Not saved");
        assert_eq!(value["saved"], false);
    }

    #[test]
    fn create_messages() {
        let op = Operation::CreateDocument {
            kind: DocumentKind::Product,
            name: "Gearbox".to_string(),
        };
        assert_eq!(
            shape(&op, &[]).unwrap().into_text(),
            "Created new Product document: Gearbox"
        );

        let op = Operation::CreateSketch {
            plane: Plane::Xy,
            name: Some("Base".to_string()),
        };
        assert_eq!(
            shape(&op, &[]).unwrap().into_text(),
            "Created sketch on xy plane with name Base"
        );
    }

    #[test]
    fn save_messages() {
        let op = Operation::SaveDocument { file_path: None };
        let records = vec![record(&[("name", "Part1.CATPart")])];
        assert_eq!(
            shape(&op, &records).unwrap().into_text(),
            "Document saved: Part1.CATPart"
        );

        let op = Operation::SaveDocument {
            file_path: Some(r"C:\out\Part1.CATPart".to_string()),
        };
        assert_eq!(
            shape(&op, &[]).unwrap().into_text(),
            r"Document saved to: C:\out\Part1.CATPart"
        );
    }

    #[test]
    fn rectangle_result() {
        let op = Operation::CreateRectangle(Rectangle {
            x: 10.0,
            y: 10.0,
            width: 4.0,
            height: 2.0,
            centered: false,
        });
        let ToolOutput::Data(value) = shape(&op, &[]).unwrap() else {
            panic!("expected data");
        };
        assert_eq!(value["centered"], false);
        assert_eq!(value["corners"]["bottom_left"], json!([10.0, 10.0]));
        assert_eq!(value["corners"]["top_right"], json!([14.0, 12.0]));
        assert!(value["message"]
            .as_str()
            .unwrap()
            .contains("width=4mm, height=2mm"));
    }

    #[test]
    fn missing_field_is_malformed() {
        let records = vec![record(&[("name", "Part1.CATPart")])];
        let err = shape(&Operation::ListDocuments, &records).unwrap_err();
        assert!(matches!(err, CatiaError::MalformedOutput { .. }));
    }

    #[test]
    fn close_of_unknown_document_is_a_message() {
        let op = Operation::CloseDocument {
            document_name: "Part9.CATPart".to_string(),
        };
        let closed = shape(&op, &[record(&[("found", "true")])]).unwrap();
        assert_eq!(closed.into_text(), "Closed document: Part9.CATPart");

        let missing = shape(&op, &[record(&[("found", "false")])]).unwrap();
        assert_eq!(missing.into_text(), "Document not found: Part9.CATPart");
    }

    #[test]
    fn open_requires_record() {
        let op = Operation::OpenDocument {
            file_path: "a.CATPart".to_string(),
        };
        assert!(shape(&op, &[]).is_err());
    }
}
