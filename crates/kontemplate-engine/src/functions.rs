//! Template functions (global functions available in templates)

use minijinja::{Error, ErrorKind, State, Value};
use std::collections::BTreeSet;
use std::net::ToSocketAddrs;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Maximum nesting depth for `insert_template`
const MAX_INSERT_DEPTH: i64 = 10;

/// Variable carrying the current `insert_template` depth
const INSERT_DEPTH_VAR: &str = "__kontemplate_insert_depth";

/// Fail with a custom error message
///
/// Usage: {{ fail("DOMAIN must be set") }}
pub fn fail(message: String) -> Result<Value, Error> {
    Err(Error::new(ErrorKind::InvalidOperation, message))
}

/// Read a file next to the template verbatim
///
/// Only files inside the resource set directory can be read; absolute
/// paths and paths resolving outside of it (`..`, symlinks) are refused.
///
/// Usage: {{ insert_file("config/nginx.conf") | indent(4) }}
pub fn insert_file(base_dir: &Path, path: &str) -> Result<String, Error> {
    let full_path = resolve_in(base_dir, path)?;
    std::fs::read_to_string(&full_path).map_err(|e| {
        Error::new(
            ErrorKind::InvalidOperation,
            format!("insert_file: cannot read {}: {}", full_path.display(), e),
        )
    })
}

fn resolve_in(base_dir: &Path, path: &str) -> Result<PathBuf, Error> {
    let refuse = |reason: String| {
        Error::new(ErrorKind::InvalidOperation, format!("insert_file: {}", reason))
    };

    if Path::new(path).is_absolute() {
        return Err(refuse(format!("absolute path '{}' is not allowed", path)));
    }

    let root = base_dir
        .canonicalize()
        .map_err(|e| refuse(format!("cannot resolve {}: {}", base_dir.display(), e)))?;
    let resolved = root
        .join(path)
        .canonicalize()
        .map_err(|e| refuse(format!("cannot read {}: {}", path, e)))?;

    if !resolved.starts_with(&root) {
        return Err(refuse(format!("'{}' is outside the resource set directory", path)));
    }
    Ok(resolved)
}

/// Render another template from the resource set directory with the
/// variables of the current resource set
///
/// Usage: {{ insert_template("common/labels.yaml") | indent(4) }}
pub fn insert_template(
    state: &State,
    variables: &serde_json::Value,
    path: &str,
) -> Result<String, Error> {
    let depth = state
        .lookup(INSERT_DEPTH_VAR)
        .and_then(|v| i64::try_from(v).ok())
        .unwrap_or(0);

    if depth >= MAX_INSERT_DEPTH {
        return Err(Error::new(
            ErrorKind::InvalidOperation,
            format!(
                "insert_template: nesting deeper than {} while inserting '{}'",
                MAX_INSERT_DEPTH, path
            ),
        ));
    }

    let template = state.env().get_template(path)?;

    let mut vars = variables.as_object().cloned().unwrap_or_default();
    vars.insert(INSERT_DEPTH_VAR.to_string(), serde_json::Value::from(depth + 1));

    template.render(Value::from_serialize(serde_json::Value::Object(vars)))
}

/// Resolve a hostname to its IP addresses
///
/// Usage: {{ lookup_ip_addr("db.internal") | first }}
pub fn lookup_ip_addr(host: String) -> Result<Vec<String>, Error> {
    let addrs = (host.as_str(), 0).to_socket_addrs().map_err(|e| {
        Error::new(
            ErrorKind::InvalidOperation,
            format!("lookup_ip_addr: cannot resolve '{}': {}", host, e),
        )
    })?;

    let unique: BTreeSet<String> = addrs.map(|addr| addr.ip().to_string()).collect();
    Ok(unique.into_iter().collect())
}

/// Read a secret from the `pass` password store
///
/// Usage: {{ pass_lookup("cluster/db-password") | b64encode }}
pub fn pass_lookup(key: String) -> Result<String, Error> {
    let output = Command::new("pass")
        .args(["show", key.as_str()])
        .output()
        .map_err(|e| {
            Error::new(
                ErrorKind::InvalidOperation,
                format!("pass_lookup: could not run pass: {}", e),
            )
        })?;

    if !output.status.success() {
        return Err(Error::new(
            ErrorKind::InvalidOperation,
            format!(
                "pass_lookup: '{}' not found: {}",
                key,
                String::from_utf8_lossy(&output.stderr).trim()
            ),
        ));
    }

    let secret = String::from_utf8(output.stdout).map_err(|e| {
        Error::new(
            ErrorKind::InvalidOperation,
            format!("pass_lookup: '{}' is not valid UTF-8: {}", key, e),
        )
    })?;

    Ok(secret.trim_end_matches('\n').to_string())
}
