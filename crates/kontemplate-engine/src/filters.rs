//! Manifest-oriented template filters
//!
//! These extend MiniJinja with the helpers manifests usually need.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use minijinja::{Error, ErrorKind, Value};
use sha2::{Digest, Sha256};

fn invalid(context: &str, err: impl std::fmt::Display) -> Error {
    Error::new(ErrorKind::InvalidOperation, format!("{}: {}", context, err))
}

fn to_json(value: &Value) -> Result<serde_json::Value, Error> {
    serde_json::to_value(value).map_err(|e| invalid("value is not serializable", e))
}

/// The string content of a value, or its display form for non-strings
fn text_of(value: &Value) -> String {
    value
        .as_str()
        .map(str::to_string)
        .unwrap_or_else(|| value.to_string())
}

/// Serialize a value as a YAML block without document marker or final newline
///
/// Usage: `{{ resources | toyaml | nindent(4) }}`
pub fn toyaml(value: Value) -> Result<String, Error> {
    let yaml = serde_yaml::to_string(&to_json(&value)?).map_err(|e| invalid("toyaml", e))?;
    Ok(yaml.trim_start_matches("---\n").trim_end().to_string())
}

/// Usage: `{{ labels | tojson }}`
pub fn tojson(value: Value) -> Result<String, Error> {
    serde_json::to_string(&to_json(&value)?).map_err(|e| invalid("tojson", e))
}

pub fn tojson_pretty(value: Value) -> Result<String, Error> {
    serde_json::to_string_pretty(&to_json(&value)?).map_err(|e| invalid("tojson_pretty", e))
}

/// Usage: `password: {{ DB_PASSWORD | b64encode }}`
#[must_use]
pub fn b64encode(value: String) -> String {
    BASE64.encode(value)
}

pub fn b64decode(value: String) -> Result<String, Error> {
    let bytes = BASE64.decode(value).map_err(|e| invalid("b64decode", e))?;
    String::from_utf8(bytes).map_err(|e| invalid("b64decode", e))
}

/// Double-quote a value, escaping backslashes and quotes
#[must_use]
pub fn quote(value: Value) -> String {
    let text = text_of(&value).replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{}\"", text)
}

/// Single-quote a value the way YAML escapes single quotes
#[must_use]
pub fn squote(value: Value) -> String {
    format!("'{}'", text_of(&value).replace('\'', "''"))
}

/// Indent every non-empty line by `width` spaces, the first one included
#[must_use]
pub fn indent(value: String, width: usize) -> String {
    let pad = " ".repeat(width);
    value
        .lines()
        .map(|line| {
            if line.is_empty() {
                String::new()
            } else {
                format!("{}{}", pad, line)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Like `indent`, but starts on a fresh line
///
/// Usage: `labels:{{ labels | toyaml | nindent(2) }}`
#[must_use]
pub fn nindent(value: String, width: usize) -> String {
    format!("\n{}", indent(value, width))
}

/// Hex encoded SHA-256 digest, handy for config checksums
#[must_use]
pub fn sha256sum(value: String) -> String {
    format!("{:x}", Sha256::digest(value.as_bytes()))
}
