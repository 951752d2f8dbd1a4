//! Template errors and the per-run failure report

use indexmap::IndexMap;
use miette::{Diagnostic, NamedSource, SourceSpan};
use minijinja::ErrorKind;
use serde_json::Value as JsonValue;
use thiserror::Error;

use crate::suggestions;

/// Broad category of a template failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum TemplateErrorKind {
    UndefinedVariable,
    UnknownFilter,
    UnknownFunction,
    SyntaxError,
    TypeError,
    InvalidOperation,
    /// Template or default variable file could not be read
    Io,
    Other,
}

impl From<ErrorKind> for TemplateErrorKind {
    fn from(kind: ErrorKind) -> Self {
        match kind {
            ErrorKind::UndefinedError => Self::UndefinedVariable,
            ErrorKind::UnknownFilter => Self::UnknownFilter,
            ErrorKind::UnknownFunction => Self::UnknownFunction,
            ErrorKind::SyntaxError => Self::SyntaxError,
            ErrorKind::InvalidOperation => Self::InvalidOperation,
            ErrorKind::NonPrimitive | ErrorKind::NonKey | ErrorKind::CannotUnpack => {
                Self::TypeError
            }
            _ => Self::Other,
        }
    }
}

/// Failure to render a single template file
#[derive(Error, Debug, Diagnostic, Clone)]
#[error("{message}")]
#[diagnostic(code(kontemplate::template::render))]
pub struct TemplateError {
    pub message: String,

    pub kind: TemplateErrorKind,

    #[source_code]
    pub src: NamedSource<String>,

    #[label("error occurred here")]
    pub span: Option<SourceSpan>,

    /// "Did you mean" style hint
    #[help]
    pub suggestion: Option<String>,
}

impl TemplateError {
    /// Build a diagnostic from a MiniJinja error
    ///
    /// `values` is the mapping the template was rendered with and feeds the
    /// near-miss variable suggestions.
    pub fn from_minijinja(
        err: minijinja::Error,
        template_name: &str,
        template_source: &str,
        values: Option<&JsonValue>,
    ) -> Self {
        let kind = TemplateErrorKind::from(err.kind());
        let summary = err.to_string();

        // With debug info enabled the alternate form includes the source
        // excerpt, where the failing line is marked with `>`
        let excerpt = format!("{:#}", err);
        let failing_line = marked_line(&excerpt);

        let (message, suggestion) = match kind {
            TemplateErrorKind::UndefinedVariable => {
                let variable = failing_line
                    .and_then(expression_on)
                    .or_else(|| suggestions::extract_quoted_name(&summary));
                let hint = match (&variable, values) {
                    (Some(name), Some(values)) => {
                        suggestions::suggest_undefined_variable(name, values)
                    }
                    (Some(name), None) => Some(format!(
                        "`{}` is not set; define it or fall back with `| default(...)`",
                        name
                    )),
                    (None, _) => None,
                };
                let message = match variable {
                    Some(name) => format!("undefined variable `{}`", name),
                    None => summary.replace("undefined value", "undefined variable"),
                };
                (message, hint)
            }
            TemplateErrorKind::UnknownFilter => {
                match failing_line
                    .and_then(filter_on)
                    .or_else(|| suggestions::extract_quoted_name(&summary))
                    .or_else(|| word_after(&summary, "filter"))
                {
                    Some(name) => (
                        format!("unknown filter `{}`", name),
                        suggestions::suggest_unknown_filter(&name),
                    ),
                    None => (summary, None),
                }
            }
            TemplateErrorKind::UnknownFunction => {
                let hint = suggestions::extract_quoted_name(&summary)
                    .and_then(|name| suggestions::suggest_unknown_function(&name));
                (summary, hint)
            }
            TemplateErrorKind::SyntaxError => {
                let hint = syntax_hint(&summary);
                (strip_kind_prefix(&summary), hint)
            }
            TemplateErrorKind::InvalidOperation if summary.contains("not iterable") => (
                strip_kind_prefix(&summary),
                Some(suggestions::suggest_iteration_fix("map")),
            ),
            _ => (strip_kind_prefix(&summary), None),
        };

        Self {
            message,
            kind,
            src: NamedSource::new(template_name, template_source.to_string()),
            span: err.line().and_then(|line| line_span(template_source, line)),
            suggestion,
        }
    }

    /// An error without source information
    pub fn simple(kind: TemplateErrorKind, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind,
            src: NamedSource::new("<none>", String::new()),
            span: None,
            suggestion: None,
        }
    }

    /// A template file that could not be read
    pub fn io(path: &std::path::Path, err: &std::io::Error) -> Self {
        Self {
            src: NamedSource::new(path.display().to_string(), String::new()),
            ..Self::simple(
                TemplateErrorKind::Io,
                format!("failed to read {}: {}", path.display(), err),
            )
        }
    }

    pub fn kind(&self) -> TemplateErrorKind {
        self.kind
    }
}

/// The excerpt line MiniJinja marks as failing:
///
/// ```text
///    8 >   replicas: {{ REPLICA }}
///      i               ^^^^^^^ undefined value
/// ```
fn marked_line(excerpt: &str) -> Option<&str> {
    excerpt.lines().find(|line| {
        let line = line.trim_start();
        line.starts_with("> ")
            || line
                .split_once(" > ")
                .is_some_and(|(number, _)| number.chars().all(|c| c.is_ascii_digit()))
    })
}

/// The first `{{ ... }}` block on a line, without its filters
fn expression_on(line: &str) -> Option<String> {
    let inner = braced(line)?;
    let expression = inner.split('|').next().unwrap_or(inner).trim();
    (!expression.is_empty()).then(|| expression.to_string())
}

/// The last filter applied in the first `{{ ... }}` block on a line
fn filter_on(line: &str) -> Option<String> {
    let inner = braced(line)?;
    let (_, filter) = inner.rsplit_once('|')?;
    let name = filter.trim().split(['(', ' ']).next().unwrap_or_default();
    (!name.is_empty()).then(|| name.to_string())
}

fn braced(line: &str) -> Option<&str> {
    let start = line.find("{{")? + 2;
    let len = line[start..].find("}}")?;
    Some(line[start..start + len].trim())
}

/// `filter toyml is unknown` -> `toyml`
fn word_after(message: &str, keyword: &str) -> Option<String> {
    let mut words = message.split_whitespace();
    words.find(|word| *word == keyword)?;
    words.next().map(str::to_string)
}

fn strip_kind_prefix(message: &str) -> String {
    ["syntax error: ", "invalid operation: "]
        .iter()
        .fold(message.to_string(), |msg, prefix| msg.replace(prefix, ""))
}

fn syntax_hint(message: &str) -> Option<String> {
    if message.contains("end of input") || message.contains("expected") {
        Some(
            "a block is not closed; `{{ }}` wraps expressions and `{% %}` wraps statements"
                .to_string(),
        )
    } else {
        None
    }
}

/// Byte span of a 1-based line within `source`
fn line_span(source: &str, line: usize) -> Option<SourceSpan> {
    let mut offset = 0;
    for (number, text) in (1..).zip(source.split('\n')) {
        if number == line {
            return Some(SourceSpan::new(offset.into(), text.len()));
        }
        offset += text.len() + 1;
    }
    None
}

/// Template files that failed to render during one run
///
/// Failing files are left out of the output; the rest of the run is not
/// affected. Keys are `<resource set>/<file>`, in the order failures
/// happened.
#[derive(Debug, Default)]
pub struct RenderReport {
    pub failures: IndexMap<String, Vec<TemplateError>>,

    /// Keys of files that rendered
    pub rendered: Vec<String>,
}

impl RenderReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_failure(&mut self, file: String, error: TemplateError) {
        self.failures.entry(file).or_default().push(error);
    }

    pub fn record_success(&mut self, file: String) {
        self.rendered.push(file);
    }

    pub fn has_errors(&self) -> bool {
        !self.failures.is_empty()
    }

    /// Number of errors across all files
    pub fn error_count(&self) -> usize {
        self.failures.values().map(Vec::len).sum()
    }

    /// Number of files with at least one error
    pub fn failed_files(&self) -> usize {
        self.failures.len()
    }

    /// Every error with its file key
    pub fn errors(&self) -> impl Iterator<Item = (&str, &TemplateError)> {
        self.failures
            .iter()
            .flat_map(|(file, errors)| errors.iter().map(move |e| (file.as_str(), e)))
    }

    /// "3 errors in 2 files"
    pub fn summary(&self) -> String {
        fn plural(count: usize, word: &str) -> String {
            if count == 1 {
                format!("{} {}", count, word)
            } else {
                format!("{} {}s", count, word)
            }
        }

        format!(
            "{} in {}",
            plural(self.error_count(), "error"),
            plural(self.failed_files(), "file")
        )
    }
}

/// Result type for single-template rendering
pub type Result<T> = std::result::Result<T, TemplateError>;
