//! "Did you mean" hints for template errors
//!
//! Candidates are ranked by Levenshtein distance; anything further than a
//! few edits away is not worth suggesting.

use serde_json::Value as JsonValue;

const MAX_DISTANCE: usize = 3;
const MAX_CANDIDATES: usize = 3;

/// Filters available to templates: ours first, then MiniJinja built-ins
pub const AVAILABLE_FILTERS: &[&str] = &[
    "toyaml",
    "tojson",
    "tojson_pretty",
    "b64encode",
    "b64decode",
    "quote",
    "squote",
    "indent",
    "nindent",
    "sha256",
    "abs",
    "attr",
    "batch",
    "bool",
    "capitalize",
    "default",
    "dictsort",
    "escape",
    "first",
    "float",
    "int",
    "items",
    "join",
    "last",
    "length",
    "list",
    "lower",
    "map",
    "reject",
    "rejectattr",
    "replace",
    "reverse",
    "round",
    "safe",
    "select",
    "selectattr",
    "slice",
    "sort",
    "string",
    "title",
    "trim",
    "unique",
    "upper",
    "urlencode",
];

/// Functions available to templates: ours first, then MiniJinja globals
pub const AVAILABLE_FUNCTIONS: &[&str] = &[
    "fail",
    "insert_file",
    "insert_template",
    "lookup_ip_addr",
    "pass_lookup",
    "cycler",
    "dict",
    "joiner",
    "namespace",
    "range",
];

/// Candidates within a few edits of `input`, closest first
///
/// Exact matches are not returned; ties keep the candidates' order.
pub fn closest<'a>(input: &str, candidates: impl IntoIterator<Item = &'a str>) -> Vec<&'a str> {
    let mut ranked: Vec<(usize, &str)> = candidates
        .into_iter()
        .map(|candidate| (strsim::levenshtein(input, candidate), candidate))
        .filter(|(distance, _)| (1..=MAX_DISTANCE).contains(distance))
        .collect();

    ranked.sort_by_key(|(distance, _)| *distance);
    ranked
        .into_iter()
        .take(MAX_CANDIDATES)
        .map(|(_, candidate)| candidate)
        .collect()
}

fn did_you_mean(options: &[String]) -> String {
    let quoted: Vec<String> = options.iter().map(|o| format!("`{}`", o)).collect();
    format!("did you mean {}?", quoted.join(" or "))
}

/// Hint for an undefined variable, possibly a dotted path like `image.tga`
///
/// The path is followed through `values` until the first missing segment,
/// which is then compared against the keys available at that level.
pub fn suggest_undefined_variable(variable: &str, values: &JsonValue) -> Option<String> {
    let mut current = values;
    let mut prefix = String::new();

    for segment in variable.split('.') {
        if let Some(next) = current.get(segment) {
            prefix.push_str(segment);
            prefix.push('.');
            current = next;
            continue;
        }

        let keys: Vec<&str> = current
            .as_object()
            .map(|map| map.keys().map(String::as_str).collect())
            .unwrap_or_default();

        let matches = closest(segment, keys.iter().copied());
        if !matches.is_empty() {
            let options: Vec<String> = matches.iter().map(|m| format!("{}{}", prefix, m)).collect();
            return Some(did_you_mean(&options));
        }

        return Some(if keys.is_empty() {
            format!(
                "`{}` is not set; define it under `global` or in the resource set's `values`, \
                 or pass --var {}=...",
                variable, variable
            )
        } else {
            format!("`{}` is not set; known here: {}", variable, keys.join(", "))
        });
    }

    None
}

pub fn suggest_unknown_filter(name: &str) -> Option<String> {
    let matches = closest(name, AVAILABLE_FILTERS.iter().copied());
    if matches.is_empty() {
        return Some(format!(
            "`{}` is not a filter; manifest helpers include toyaml, tojson, b64encode and nindent",
            name
        ));
    }
    let options: Vec<String> = matches.iter().map(|m| m.to_string()).collect();
    Some(did_you_mean(&options))
}

pub fn suggest_unknown_function(name: &str) -> Option<String> {
    let matches = closest(name, AVAILABLE_FUNCTIONS.iter().copied());
    if matches.is_empty() {
        return Some(format!(
            "`{}` is not a function; available: {}",
            name,
            AVAILABLE_FUNCTIONS.join(", ")
        ));
    }
    let options: Vec<String> = matches.iter().map(|m| m.to_string()).collect();
    Some(did_you_mean(&options))
}

/// Hint for looping over something that is not a sequence
pub fn suggest_iteration_fix(type_name: &str) -> String {
    match type_name {
        "map" | "object" => {
            "iterate maps with `{% for key, value in mapping | items %}`".to_string()
        }
        "string" => "strings iterate per character; split the string first".to_string(),
        other => format!("a value of type `{}` cannot be iterated", other),
    }
}

/// First name wrapped in backticks, single or double quotes
pub fn extract_quoted_name(message: &str) -> Option<String> {
    ['`', '\'', '"'].iter().find_map(|&quote| {
        let (_, rest) = message.split_once(quote)?;
        let (name, _) = rest.split_once(quote)?;
        Some(name.to_string())
    })
}
