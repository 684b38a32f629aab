use schemars::{Schema, schema_for};
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::{Map, Value};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use tracing::{debug, trace};

use super::models::Action;
use crate::error::{Error, Result};

/// Decode a template document without checking action invariants.
///
/// Missing fields, wrong types, unknown `type` tags and out-of-range color
/// components are all reported as [`Error::Format`]. Records written by the
/// older Python clicker are accepted too.
pub fn parse_template(s: &str) -> Result<Vec<Action>> {
    decode(serde_json::from_str(s).map_err(format_error)?)
}

fn format_error(e: serde_json::Error) -> Error {
    Error::Format(e.to_string())
}

fn decode(mut doc: Value) -> Result<Vec<Action>> {
    if let Value::Array(records) = &mut doc {
        for record in records.iter_mut() {
            if let Value::Object(map) = record {
                upgrade_legacy_record(map);
            }
        }
    }
    serde_json::from_value(doc).map_err(format_error)
}

/// Rewrite a record from the Python clicker into the current shape.
///
/// | old `type`        | becomes                                  |
/// |-------------------|------------------------------------------|
/// | `left_click`      | `MouseClick`, `button: "left"`           |
/// | `right_click`     | `MouseClick`, `button: "right"`          |
/// | `double_click`    | `MouseClick`, `button: "left"`, `double` |
/// | `scroll`          | `Scroll`, `scroll_y` read as `amount`    |
/// | `key_press`       | `KeyPress`                               |
/// | `color_condition` | `ColorCondition`                         |
///
/// Old scroll records carry no coordinates and still need `x`/`y` to load.
/// Any other record is left untouched.
fn upgrade_legacy_record(record: &mut Map<String, Value>) {
    let Some(tag) = record.get("type").and_then(Value::as_str).map(str::to_owned) else {
        return;
    };
    let canonical = match tag.as_str() {
        "left_click" | "right_click" | "double_click" => {
            let button = if tag == "right_click" { "right" } else { "left" };
            record
                .entry("button")
                .or_insert_with(|| Value::from(button));
            record
                .entry("double")
                .or_insert(Value::Bool(tag == "double_click"));
            "MouseClick"
        }
        "scroll" => {
            if let Some(amount) = record.remove("scroll_y") {
                record.entry("amount").or_insert(amount);
            }
            "Scroll"
        }
        "key_press" => "KeyPress",
        "color_condition" => "ColorCondition",
        _ => return,
    };
    trace!(target: "clicker::loader", from = %tag, to = canonical, "Upgrading legacy record");
    record.insert("type".into(), Value::from(canonical));
}

/// Load a template from a string slice and validate every action.
pub fn load_from_str(s: &str) -> Result<Vec<Action>> {
    let actions = parse_template(s)?;
    validate_actions(&actions)?;
    Ok(actions)
}

/// Load a template from any reader (e.g., a file).
pub fn load_from_reader<R: Read>(reader: R) -> Result<Vec<Action>> {
    let actions = decode(serde_json::from_reader(reader).map_err(format_error)?)?;
    validate_actions(&actions)?;
    Ok(actions)
}

/// Load a template from a file path synchronously.
pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Vec<Action>> {
    let path_ref = path.as_ref();
    let file = File::open(path_ref).map_err(|e| Error::io(path_ref, e))?;
    let actions = load_from_reader(BufReader::new(file))?;
    debug!(
        target: "clicker::loader",
        path = %path_ref.display(), actions = actions.len(),
        "Loaded template"
    );
    Ok(actions)
}

/// Load a template from a file path asynchronously (Tokio).
pub async fn load_from_path_async<P: AsRef<Path>>(path: P) -> Result<Vec<Action>> {
    use tokio::fs;
    let path_ref = path.as_ref();
    let bytes = fs::read(path_ref)
        .await
        .map_err(|e| Error::io(path_ref, e))?;
    let actions = decode(serde_json::from_slice(&bytes).map_err(format_error)?)?;
    validate_actions(&actions)?;
    debug!(
        target: "clicker::loader",
        path = %path_ref.display(), actions = actions.len(),
        "Loaded template"
    );
    Ok(actions)
}

/// Render actions as a pretty-printed template (4-space indent).
pub fn to_string_pretty(actions: &[Action]) -> Result<String> {
    let mut buf = Vec::new();
    write_to_writer(&mut buf, actions)?;
    String::from_utf8(buf).map_err(|e| Error::Format(e.to_string()))
}

/// Write actions as a pretty-printed template to any writer.
pub fn write_to_writer<W: Write>(writer: W, actions: &[Action]) -> Result<()> {
    let mut ser = serde_json::Serializer::with_formatter(writer, PrettyFormatter::with_indent(b"    "));
    actions
        .serialize(&mut ser)
        .map_err(|e| Error::Format(e.to_string()))
}

/// Save actions to a template file, replacing it if present.
pub fn save_to_path<P: AsRef<Path>>(path: P, actions: &[Action]) -> Result<()> {
    let path_ref = path.as_ref();
    let file = File::create(path_ref).map_err(|e| Error::io(path_ref, e))?;
    let mut writer = BufWriter::new(file);
    write_to_writer(&mut writer, actions)?;
    writer.flush().map_err(|e| Error::io(path_ref, e))?;
    debug!(
        target: "clicker::loader",
        path = %path_ref.display(), actions = actions.len(),
        "Saved template"
    );
    Ok(())
}

/// Generate the JSON Schema of a template document.
pub fn generate_schema() -> Schema {
    schema_for!(Vec<Action>)
}

/// Write the template JSON Schema to any writer (pretty-printed).
pub fn write_schema_to_writer<W: Write>(mut writer: W) -> anyhow::Result<()> {
    use anyhow::Context;
    let schema = generate_schema();
    let json = serde_json::to_string_pretty(&schema).context("Failed to serialize schema")?;
    writer
        .write_all(json.as_bytes())
        .context("Failed to write schema to writer")?;
    Ok(())
}

/// Validate every action, naming the first offending step.
pub fn validate_actions(actions: &[Action]) -> Result<()> {
    for (idx, action) in actions.iter().enumerate() {
        trace!(target: "clicker::loader", step = idx, %action, "Validating action");
        action.validate().map_err(|err| match err {
            Error::Validation(msg) => Error::Validation(format!("step {idx}: {msg}")),
            other => other,
        })?;
    }
    Ok(())
}
