//! Automation operations exposed as MCP tools.
//!
//! Each [`Operation`] is a fully validated request: argument parsing and
//! range checks happen here so that nothing reaches CATIA with a missing
//! name or a negative pad length.

use serde_json::Value;

use crate::catia::error::{CatiaError, CatiaResult};

/// Kind of document created by the `create_*` tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    /// `.CATPart`
    Part,
    /// `.CATProduct`
    Product,
    /// `.CATDrawing`
    Drawing,
}

impl DocumentKind {
    /// Type name passed to `Documents.Add`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Part => "Part",
            Self::Product => "Product",
            Self::Drawing => "Drawing",
        }
    }

    /// Whether the document's root product carries a part number we can set.
    #[must_use]
    pub const fn has_part_number(self) -> bool {
        matches!(self, Self::Part | Self::Product)
    }
}

/// Origin plane a sketch is placed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Plane {
    /// XY plane.
    Xy,
    /// YZ plane.
    Yz,
    /// ZX plane.
    Zx,
}

impl Plane {
    /// Parses a plane name (case-insensitive).
    ///
    /// # Errors
    ///
    /// Returns an error for anything other than `xy`, `yz` or `zx`.
    pub fn parse(s: &str) -> CatiaResult<Self> {
        match s.to_ascii_lowercase().as_str() {
            "xy" => Ok(Self::Xy),
            "yz" => Ok(Self::Yz),
            "zx" => Ok(Self::Zx),
            _ => Err(CatiaError::invalid_argument(
                "plane",
                format!("'{s}' is not one of: xy, yz, zx"),
            )),
        }
    }

    /// Lowercase name used in messages.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Xy => "xy",
            Self::Yz => "yz",
            Self::Zx => "zx",
        }
    }

    /// Property of `Part.OriginElements` holding the plane.
    #[must_use]
    pub const fn origin_property(self) -> &'static str {
        match self {
            Self::Xy => "PlaneXY",
            Self::Yz => "PlaneYZ",
            Self::Zx => "PlaneZX",
        }
    }
}

/// Where `SystemService.ExecuteScript` looks for the macro module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MacroLibraryType {
    /// A CATIA document holding macros.
    Document,
    /// A directory of macro files.
    Directory,
    /// A VBA project file.
    VbaProject,
}

impl MacroLibraryType {
    /// Parses a library type name.
    ///
    /// # Errors
    ///
    /// Returns an error for unknown names.
    pub fn parse(s: &str) -> CatiaResult<Self> {
        match s.to_ascii_lowercase().as_str() {
            "document" => Ok(Self::Document),
            "directory" => Ok(Self::Directory),
            "vba_project" | "vba" => Ok(Self::VbaProject),
            _ => Err(CatiaError::invalid_argument(
                "library_type",
                format!("'{s}' is not one of: document, directory, vba_project"),
            )),
        }
    }

    /// Value of the `CatScriptLibraryType` enumeration.
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::Document => 0,
            Self::Directory => 1,
            Self::VbaProject => 2,
        }
    }
}

/// An axis-aligned rectangle in sketch coordinates (mm).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rectangle {
    /// Reference X coordinate.
    pub x: f64,
    /// Reference Y coordinate.
    pub y: f64,
    /// Width along X.
    pub width: f64,
    /// Height along Y.
    pub height: f64,
    /// Whether `(x, y)` is the centre rather than the bottom-left corner.
    pub centered: bool,
}

impl Rectangle {
    /// Returns the bottom-left and top-right corners.
    #[must_use]
    pub fn corners(&self) -> ([f64; 2], [f64; 2]) {
        if self.centered {
            let (hw, hh) = (self.width / 2.0, self.height / 2.0);
            ([self.x - hw, self.y - hh], [self.x + hw, self.y + hh])
        } else {
            ([self.x, self.y], [self.x + self.width, self.y + self.height])
        }
    }

    /// Returns the four edges as `(x1, y1, x2, y2)`: bottom, right, top, left.
    #[must_use]
    pub fn edges(&self) -> [(f64, f64, f64, f64); 4] {
        let ([x1, y1], [x2, y2]) = self.corners();
        [
            (x1, y1, x2, y1),
            (x2, y1, x2, y2),
            (x2, y2, x1, y2),
            (x1, y2, x1, y1),
        ]
    }
}

/// A validated automation request.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    /// Application version, visibility and caption.
    GetInfo,
    /// All open documents.
    ListDocuments,
    /// The active document, if any.
    GetActiveDocument,
    /// New Part, Product or Drawing document.
    CreateDocument {
        /// Document kind.
        kind: DocumentKind,
        /// Part number / label.
        name: String,
    },
    /// Open a document from disk.
    OpenDocument {
        /// File to open.
        file_path: String,
    },
    /// Save the active document, optionally under a new path.
    SaveDocument {
        /// Target path for "save as".
        file_path: Option<String>,
    },
    /// Close an open document by name.
    CloseDocument {
        /// Document name as shown in CATIA (e.g. `Part1.CATPart`).
        document_name: String,
    },
    /// New sketch in the first body of the active part.
    CreateSketch {
        /// Support plane.
        plane: Plane,
        /// Optional sketch name.
        name: Option<String>,
    },
    /// Pad from the last sketch.
    CreatePad {
        /// Pad length in mm.
        length: f64,
    },
    /// Pocket from the last sketch.
    CreatePocket {
        /// Pocket depth in mm.
        depth: f64,
    },
    /// Bodies of the active part.
    GetPartBodies,
    /// Update the active part.
    UpdatePart,
    /// Rectangle profile in the last sketch.
    CreateRectangle(Rectangle),
    /// Run a CATIA macro.
    ExecuteMacro {
        /// Library path (directory, document or VBA project).
        macro_path: String,
        /// Module (file) name within the library.
        module_name: String,
        /// Function to call.
        function_name: String,
        /// Library kind.
        library_type: MacroLibraryType,
    },
}

impl Operation {
    /// Builds an operation from an MCP tool name and its arguments.
    ///
    /// # Errors
    ///
    /// Returns [`CatiaError::UnknownTool`] for unrecognised names and
    /// [`CatiaError::InvalidArgument`] for missing or out-of-range arguments.
    pub fn from_tool_call(tool: &str, args: &Value) -> CatiaResult<Self> {
        let op = match tool {
            "get_catia_info" => Self::GetInfo,
            "list_documents" => Self::ListDocuments,
            "get_active_document" => Self::GetActiveDocument,
            "create_part" => Self::create_document(DocumentKind::Part, args)?,
            "create_product" => Self::create_document(DocumentKind::Product, args)?,
            "create_drawing" => Self::create_document(DocumentKind::Drawing, args)?,
            "open_document" => Self::OpenDocument {
                file_path: required_str(args, "file_path")?,
            },
            "save_document" => Self::SaveDocument {
                file_path: optional_str(args, "file_path")?,
            },
            "close_document" => Self::CloseDocument {
                document_name: required_str(args, "document_name")?,
            },
            "create_sketch" => Self::CreateSketch {
                plane: Plane::parse(&required_str(args, "plane")?)?,
                name: optional_str(args, "name")?,
            },
            "create_pad" => Self::CreatePad {
                length: positive_f64(args, "length")?,
            },
            "create_pocket" => Self::CreatePocket {
                depth: positive_f64(args, "depth")?,
            },
            "get_part_bodies" => Self::GetPartBodies,
            "update_part" => Self::UpdatePart,
            "create_rectangle" => Self::CreateRectangle(Rectangle {
                x: finite_f64(args, "x")?,
                y: finite_f64(args, "y")?,
                width: positive_f64(args, "width")?,
                height: positive_f64(args, "height")?,
                centered: optional_bool(args, "centered")?.unwrap_or(true),
            }),
            "execute_macro" => Self::ExecuteMacro {
                macro_path: required_str(args, "macro_path")?,
                module_name: required_str(args, "module_name")?,
                function_name: required_str(args, "function_name")?,
                library_type: optional_str(args, "library_type")?
                    .map_or(Ok(MacroLibraryType::Directory), |s| {
                        MacroLibraryType::parse(&s)
                    })?,
            },
            _ => {
                return Err(CatiaError::UnknownTool {
                    name: tool.to_string(),
                })
            }
        };
        Ok(op)
    }

    fn create_document(kind: DocumentKind, args: &Value) -> CatiaResult<Self> {
        Ok(Self::CreateDocument {
            kind,
            name: required_str(args, "name")?,
        })
    }

    /// Filesystem paths the operation touches.
    #[must_use]
    pub fn file_paths(&self) -> Vec<&str> {
        match self {
            Self::OpenDocument { file_path } => vec![file_path.as_str()],
            Self::SaveDocument {
                file_path: Some(path),
            } => vec![path.as_str()],
            Self::ExecuteMacro { macro_path, .. } => vec![macro_path.as_str()],
            _ => Vec::new(),
        }
    }
}

/// Rejects empty strings and strings that cannot be embedded in a script line.
fn check_text(name: &str, value: &str) -> CatiaResult<()> {
    if value.trim().is_empty() {
        return Err(CatiaError::invalid_argument(name, "must not be empty"));
    }
    if value.chars().any(char::is_control) {
        return Err(CatiaError::invalid_argument(
            name,
            "must not contain control characters",
        ));
    }
    Ok(())
}

fn required_str(args: &Value, name: &str) -> CatiaResult<String> {
    optional_str(args, name)?.ok_or_else(|| {
        CatiaError::invalid_argument(name, "missing required parameter")
    })
}

fn optional_str(args: &Value, name: &str) -> CatiaResult<Option<String>> {
    match args.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => {
            check_text(name, s)?;
            Ok(Some(s.clone()))
        }
        Some(_) => Err(CatiaError::invalid_argument(name, "must be a string")),
    }
}

fn optional_bool(args: &Value, name: &str) -> CatiaResult<Option<bool>> {
    match args.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Bool(b)) => Ok(Some(*b)),
        Some(_) => Err(CatiaError::invalid_argument(name, "must be a boolean")),
    }
}

fn finite_f64(args: &Value, name: &str) -> CatiaResult<f64> {
    let value = args
        .get(name)
        .ok_or_else(|| CatiaError::invalid_argument(name, "missing required parameter"))?
        .as_f64()
        .ok_or_else(|| CatiaError::invalid_argument(name, "must be a number"))?;
    if !value.is_finite() {
        return Err(CatiaError::invalid_argument(name, "must be finite"));
    }
    Ok(value)
}

fn positive_f64(args: &Value, name: &str) -> CatiaResult<f64> {
    let value = finite_f64(args, name)?;
    if value <= 0.0 {
        return Err(CatiaError::invalid_argument(
            name,
            format!("must be greater than zero, got {value}"),
        ));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_no_argument_tools() {
        for (tool, expected) in [
            ("get_catia_info", Operation::GetInfo),
            ("list_documents", Operation::ListDocuments),
            ("get_active_document", Operation::GetActiveDocument),
            ("get_part_bodies", Operation::GetPartBodies),
            ("update_part", Operation::UpdatePart),
        ] {
            assert_eq!(Operation::from_tool_call(tool, &json!({})).unwrap(), expected);
        }
    }

    #[test]
    fn parse_create_documents() {
        let op = Operation::from_tool_call("create_product", &json!({"name": "Gearbox"})).unwrap();
        assert_eq!(
            op,
            Operation::CreateDocument {
                kind: DocumentKind::Product,
                name: "Gearbox".to_string()
            }
        );
        assert!(Operation::from_tool_call("create_part", &json!({})).is_err());
    }

    #[test]
    fn unknown_tool() {
        let err = Operation::from_tool_call("delete_everything", &json!({})).unwrap_err();
        assert!(matches!(err, CatiaError::UnknownTool { .. }));
    }

    #[test]
    fn sketch_plane_is_case_insensitive() {
        let op = Operation::from_tool_call("create_sketch", &json!({"plane": "YZ"})).unwrap();
        assert_eq!(
            op,
            Operation::CreateSketch {
                plane: Plane::Yz,
                name: None
            }
        );
    }

    #[test]
    fn reject_unknown_plane() {
        let err = Operation::from_tool_call("create_sketch", &json!({"plane": "xz"})).unwrap_err();
        assert!(err.to_string().contains("plane"));
    }

    #[test]
    fn reject_non_positive_pad() {
        assert!(Operation::from_tool_call("create_pad", &json!({"length": 0.0})).is_err());
        assert!(Operation::from_tool_call("create_pocket", &json!({"depth": -3})).is_err());
        assert!(Operation::from_tool_call("create_pad", &json!({"length": "10"})).is_err());
    }

    #[test]
    fn reject_control_characters() {
        let args = json!({"document_name": "Part1\r\nWScript.Quit"});
        assert!(Operation::from_tool_call("close_document", &args).is_err());
    }

    #[test]
    fn reject_blank_name() {
        assert!(Operation::from_tool_call("create_part", &json!({"name": "   "})).is_err());
    }

    #[test]
    fn rectangle_defaults_to_centered() {
        let args = json!({"x": 0, "y": 0, "width": 20, "height": 10});
        let Operation::CreateRectangle(rect) =
            Operation::from_tool_call("create_rectangle", &args).unwrap()
        else {
            panic!("expected rectangle");
        };
        assert!(rect.centered);
        assert_eq!(rect.corners(), ([-10.0, -5.0], [10.0, 5.0]));
    }

    #[test]
    fn rectangle_from_corner() {
        let rect = Rectangle {
            x: 5.0,
            y: 2.0,
            width: 4.0,
            height: 3.0,
            centered: false,
        };
        assert_eq!(rect.corners(), ([5.0, 2.0], [9.0, 5.0]));
    }

    #[test]
    fn rectangle_edges_close_the_loop() {
        let rect = Rectangle {
            x: 0.0,
            y: 0.0,
            width: 2.0,
            height: 2.0,
            centered: true,
        };
        let edges = rect.edges();
        for i in 0..4 {
            let (_, _, ex, ey) = edges[i];
            let (nx, ny, _, _) = edges[(i + 1) % 4];
            assert!((ex - nx).abs() < f64::EPSILON);
            assert!((ey - ny).abs() < f64::EPSILON);
        }
    }

    #[test]
    fn macro_library_type_defaults_to_directory() {
        let args = json!({
            "macro_path": "C:\\Macros",
            "module_name": "Tools.catvbs",
            "function_name": "CATMain"
        });
        let op = Operation::from_tool_call("execute_macro", &args).unwrap();
        let Operation::ExecuteMacro { library_type, .. } = op else {
            panic!("expected macro");
        };
        assert_eq!(library_type, MacroLibraryType::Directory);
        assert_eq!(library_type.code(), 1);
    }

    #[test]
    fn file_paths_cover_disk_access() {
        let save_as = Operation::SaveDocument {
            file_path: Some("C:\\out.CATPart".to_string()),
        };
        assert_eq!(save_as.file_paths(), vec!["C:\\out.CATPart"]);
        assert!(Operation::SaveDocument { file_path: None }
            .file_paths()
            .is_empty());
        assert!(Operation::GetInfo.file_paths().is_empty());
    }
}
