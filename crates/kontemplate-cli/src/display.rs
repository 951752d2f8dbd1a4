//! Display formatting for CLI output

use console::style;
use kontemplate_engine::RenderReport;
use kontemplate_kube::{DispatchMode, SkipReason};

/// Print template failures as warnings on stderr
///
/// With `verbose`, each failure is shown as a full diagnostic with the
/// offending source line.
pub fn display_render_report(report: &RenderReport, verbose: bool) {
    eprintln!(
        "{} {} skipped ({})",
        style("warning:").yellow().bold(),
        if report.failed_files() == 1 { "1 file was" } else { "some files were" },
        style(report.summary()).bold()
    );

    for (file, error) in report.errors() {
        if verbose {
            eprintln!("{:?}", miette::Report::new(error.clone()));
            continue;
        }

        eprintln!("  {} {}: {}", style("✗").red(), style(file).yellow(), error.message);
        if let Some(suggestion) = &error.suggestion {
            eprintln!("      {} {}", style("hint:").blue(), suggestion);
        }
    }
}

/// Warn about a resource set that nothing was done with
///
/// Printed directly rather than logged so that `RUST_LOG` cannot hide it.
pub fn warn_skipped(set_name: &str, reason: SkipReason, mode: Option<DispatchMode>) {
    let why = match (reason, mode) {
        (SkipReason::Unsupported, Some(mode)) => format!("helm has no '{}' operation", mode),
        (SkipReason::Unsupported, None) => "helm has no equivalent operation".to_string(),
        (SkipReason::Empty, _) => "no rendered resources".to_string(),
    };
    eprintln!(
        "{} resource set '{}' skipped: {}",
        style("warning:").for_stderr().yellow().bold(),
        set_name,
        why
    );
}
