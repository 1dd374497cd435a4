//! VBScript generation for the Windows Script Host.
//!
//! Every operation becomes one self-contained script: a prelude that attaches
//! to CATIA through COM, helper procedures, then the operation body. Scripts
//! report results on stdout as `key<TAB>value` lines, with `---` closing each
//! record, and signal failures through their exit code.

use crate::catia::operation::{Operation, Plane, Rectangle};
use crate::config::CatiaConfig;

/// An automation call raised an error; the message is on stderr.
pub const EXIT_AUTOMATION_FAILED: i32 = 2;

/// CATIA could not be reached or started.
pub const EXIT_CONNECT_FAILED: i32 = 3;

/// A requested document, body or sketch does not exist.
pub const EXIT_NOT_FOUND: i32 = 4;

/// Terminates a record in script output.
pub const RECORD_END: &str = "---";

const HELPERS: &str = r#"Option Explicit
On Error Resume Next

Sub Fail(context)
    If Err.Number <> 0 Then
        WScript.StdErr.WriteLine context & ": " & Err.Description & " (0x" & Hex(Err.Number) & ")"
        WScript.Quit 2
    End If
End Sub

Sub Missing(message)
    WScript.StdErr.WriteLine message
    WScript.Quit 4
End Sub

Function Clean(value)
    Clean = Replace(Replace(Replace(CStr(value), vbTab, " "), vbCr, " "), vbLf, " ")
End Function

Function BoolText(value)
    If value Then
        BoolText = "true"
    Else
        BoolText = "false"
    End If
End Function

Sub Emit(key, value)
    WScript.StdOut.WriteLine key & vbTab & Clean(value)
End Sub

Sub EndRecord()
    WScript.StdOut.WriteLine "---"
End Sub
"#;

/// Quotes a string as a VBScript literal.
#[must_use]
pub fn vbs_string(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

/// Renders a number as a VBScript literal.
///
/// `Display` for `f64` never uses exponent notation and always uses `.` as the
/// decimal separator, which is what the VBScript parser expects regardless of
/// the system locale.
#[must_use]
pub fn vbs_number(value: f64) -> String {
    format!("{value}")
}

/// Accumulates script lines.
struct ScriptBuilder {
    buf: String,
}

impl ScriptBuilder {
    fn new(config: &CatiaConfig) -> Self {
        let mut builder = Self {
            buf: String::from(HELPERS),
        };
        builder.connect(config);
        builder
    }

    fn line(&mut self, line: &str) {
        self.buf.push_str(line);
        self.buf.push_str("\r\n");
    }

    /// Emits a statement followed by an error check.
    fn checked(&mut self, statement: &str, context: &str) {
        self.line(statement);
        self.line(&format!("Fail {}", vbs_string(context)));
    }

    /// Emits a statement whose failure is tolerated.
    fn tolerated(&mut self, statement: &str) {
        self.line(statement);
        self.line("Err.Clear");
    }

    fn connect(&mut self, config: &CatiaConfig) {
        let prog_id = vbs_string(&config.prog_id);
        self.line("");
        self.line("Dim catia");
        self.line(&format!("Set catia = GetObject(, {prog_id})"));
        if config.launch_if_not_running {
            self.line("If Err.Number <> 0 Then");
            self.line("    Err.Clear");
            self.line(&format!("    Set catia = CreateObject({prog_id})"));
            self.line("End If");
        }
        self.line("If Err.Number <> 0 Then");
        self.line("    WScript.StdErr.WriteLine Err.Description & \" (0x\" & Hex(Err.Number) & \")\"");
        self.line(&format!("    WScript.Quit {EXIT_CONNECT_FAILED}"));
        self.line("End If");
        self.line("");
    }

    /// Binds `part`, `body` and `sketches` for the active part's first body.
    fn active_part_body(&mut self) {
        self.line("Dim part, body, sketches");
        self.checked(
            "Set part = catia.ActiveDocument.Part",
            "The active document is not a Part",
        );
        self.checked("Set body = part.Bodies.Item(1)", "Accessing the first body");
        self.checked("Set sketches = body.Sketches", "Accessing sketches");
    }

    /// Binds `sketch` to the last sketch of the first body.
    fn last_sketch(&mut self) {
        self.line("Dim sketch");
        self.line("If sketches.Count = 0 Then Missing \"The first body has no sketches\"");
        self.checked(
            "Set sketch = sketches.Item(sketches.Count)",
            "Accessing the last sketch",
        );
    }

    fn emit(&mut self, key: &str, expression: &str) {
        self.checked(
            &format!("Emit {}, {expression}", vbs_string(key)),
            &format!("Reading {key}"),
        );
    }

    fn end_record(&mut self) {
        self.line("EndRecord");
    }

    fn finish(mut self) -> String {
        self.line("WScript.Quit 0");
        self.buf
    }
}

/// Generates a script that only attaches to CATIA and reports its caption.
#[must_use]
pub fn render_connect_check(config: &CatiaConfig) -> String {
    let mut s = ScriptBuilder::new(config);
    s.emit("caption", "catia.Caption");
    s.end_record();
    s.finish()
}

/// Generates the script for an operation.
#[must_use]
#[allow(clippy::too_many_lines)]
pub fn render(op: &Operation, config: &CatiaConfig) -> String {
    let mut s = ScriptBuilder::new(config);

    match op {
        Operation::GetInfo => {
            s.emit("version", "catia.SystemConfiguration.Version");
            s.emit("release", "catia.SystemConfiguration.Release");
            s.emit("service_pack", "catia.SystemConfiguration.ServicePack");
            s.emit("visible", "BoolText(catia.Visible)");
            s.emit("caption", "catia.Caption");
            s.emit("full_name", "catia.FullName");
            s.end_record();
        }
        Operation::ListDocuments => {
            s.line("Dim documents, doc, i");
            s.checked("Set documents = catia.Documents", "Accessing Documents");
            s.line("For i = 1 To documents.Count");
            s.checked("Set doc = documents.Item(i)", "Reading document");
            s.emit("name", "doc.Name");
            s.emit("full_name", "doc.FullName");
            s.end_record();
            s.line("Next");
        }
        Operation::GetActiveDocument => {
            s.line("Dim doc");
            s.line("If catia.Documents.Count = 0 Then WScript.Quit 0");
            s.checked("Set doc = catia.ActiveDocument", "Accessing ActiveDocument");
            s.emit("name", "doc.Name");
            s.emit("full_name", "doc.FullName");
            s.tolerated("Emit \"path\", doc.Path");
            s.emit("saved", "BoolText(doc.Saved)");
            s.end_record();
        }
        Operation::CreateDocument { kind, name } => {
            s.line("Dim doc");
            s.checked(
                &format!("Set doc = catia.Documents.Add({})", vbs_string(kind.as_str())),
                &format!("Creating {} document", kind.as_str()),
            );
            if kind.has_part_number() {
                s.checked(
                    &format!("doc.Product.PartNumber = {}", vbs_string(name)),
                    "Setting part number",
                );
            }
            s.emit("name", "doc.Name");
            s.end_record();
        }
        Operation::OpenDocument { file_path } => {
            s.line("Dim doc");
            s.checked(
                &format!("Set doc = catia.Documents.Open({})", vbs_string(file_path)),
                "Opening document",
            );
            s.emit("name", "doc.Name");
            s.end_record();
        }
        Operation::SaveDocument { file_path } => {
            s.line("Dim doc");
            s.checked("Set doc = catia.ActiveDocument", "Accessing ActiveDocument");
            match file_path {
                Some(path) => s.checked(&format!("doc.SaveAs {}", vbs_string(path)), "Saving document"),
                None => s.checked("doc.Save", "Saving document"),
            }
            s.emit("name", "doc.Name");
            s.end_record();
        }
        Operation::CloseDocument { document_name } => {
            let name = vbs_string(document_name);
            s.line("Dim documents, doc, docName, i, found");
            s.line("found = False");
            s.checked("Set documents = catia.Documents", "Accessing Documents");
            s.line("For i = 1 To documents.Count");
            s.checked("Set doc = documents.Item(i)", "Reading document");
            // Errors inside an If condition fall through to Then under Resume Next.
            s.checked("docName = doc.Name", "Reading document name");
            s.line(&format!("    If docName = {name} Then"));
            s.checked("doc.Close", "Closing document");
            s.line("        found = True");
            s.line("        Exit For");
            s.line("    End If");
            s.line("Next");
            s.emit("found", "BoolText(found)");
            s.end_record();
        }
        Operation::CreateSketch { plane, name } => {
            s.active_part_body();
            s.line("Dim sketch");
            s.checked(
                &format!("Set sketch = sketches.Add({})", plane_expression(*plane)),
                "Creating sketch",
            );
            if let Some(name) = name {
                s.tolerated(&format!("sketch.Name = {}", vbs_string(name)));
            }
            s.emit("name", "sketch.Name");
            s.end_record();
        }
        Operation::CreatePad { length } => {
            render_feature(&mut s, "AddNewPad", *length, "Creating pad");
        }
        Operation::CreatePocket { depth } => {
            render_feature(&mut s, "AddNewPocket", *depth, "Creating pocket");
        }
        Operation::GetPartBodies => {
            s.line("Dim part, bodies, i");
            s.checked(
                "Set part = catia.ActiveDocument.Part",
                "The active document is not a Part",
            );
            s.checked("Set bodies = part.Bodies", "Accessing bodies");
            s.line("For i = 1 To bodies.Count");
            s.emit("name", "bodies.Item(i).Name");
            s.end_record();
            s.line("Next");
        }
        Operation::UpdatePart => {
            s.line("Dim part");
            s.checked(
                "Set part = catia.ActiveDocument.Part",
                "The active document is not a Part",
            );
            s.checked("part.Update", "Updating part");
        }
        Operation::CreateRectangle(rect) => render_rectangle(&mut s, rect),
        Operation::ExecuteMacro {
            macro_path,
            module_name,
            function_name,
            library_type,
        } => {
            s.line("Dim params");
            s.line("params = Array()");
            s.checked(
                &format!(
                    "catia.SystemService.ExecuteScript {}, {}, {}, {}, params",
                    vbs_string(macro_path),
                    library_type.code(),
                    vbs_string(module_name),
                    vbs_string(function_name)
                ),
                "Executing macro",
            );
        }
    }

    s.finish()
}

fn plane_expression(plane: Plane) -> String {
    format!("part.OriginElements.{}", plane.origin_property())
}

fn render_feature(s: &mut ScriptBuilder, factory_method: &str, value: f64, context: &str) {
    s.active_part_body();
    s.last_sketch();
    s.line("Dim feature");
    s.checked(
        &format!(
            "Set feature = part.ShapeFactory.{factory_method}(sketch, {})",
            vbs_number(value)
        ),
        context,
    );
    s.checked("part.Update", "Updating part");
    s.emit("name", "feature.Name");
    s.end_record();
}

fn render_rectangle(s: &mut ScriptBuilder, rect: &Rectangle) {
    s.active_part_body();
    s.last_sketch();
    s.line("Dim factory, point, edge1, edge2, edge3, edge4");
    s.checked("Set part.InWorkObject = sketch", "Selecting sketch");
    s.checked("Set factory = sketch.OpenEdition()", "Opening sketch edition");

    let ([x1, y1], _) = rect.corners();
    s.checked(
        &format!(
            "Set point = factory.CreatePoint({}, {})",
            vbs_number(x1),
            vbs_number(y1)
        ),
        "Creating corner point",
    );
    for (i, (ax, ay, bx, by)) in rect.edges().iter().enumerate() {
        let n = i + 1;
        s.checked(
            &format!(
                "Set edge{n} = factory.CreateLine({}, {}, {}, {})",
                vbs_number(*ax),
                vbs_number(*ay),
                vbs_number(*bx),
                vbs_number(*by)
            ),
            &format!("Creating edge {n}"),
        );
    }
    for n in 1..=4 {
        s.tolerated(&format!("edge{n}.ReportName = {n}"));
    }
    s.tolerated("sketch.CloseEdition");
    s.tolerated("part.Update");
}
