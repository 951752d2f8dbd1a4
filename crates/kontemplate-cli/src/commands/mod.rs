//! CLI command implementations

pub mod deploy;
pub mod template;
pub mod version;

use console::style;
use kontemplate_core::{Context, parse_var_overrides};
use kontemplate_engine::{Engine, RenderOutput, RenderReport};
use std::path::Path;

use crate::GlobalOptions;
use crate::display;
use crate::error::{CliError, Result};

/// Load the cluster configuration and render the selected resource sets
///
/// Template failures are shown as warnings and do not stop the run.
pub(crate) fn load_and_render(
    file: &Path,
    opts: &GlobalOptions,
) -> Result<(Context, RenderOutput)> {
    let overrides = parse_var_overrides(&opts.vars)?;
    let context = Context::load(file, &overrides)?;

    for selector in opts.include.iter().chain(&opts.exclude) {
        if !context.resource_sets.iter().any(|rs| rs.matches(selector)) {
            eprintln!(
                "{} no resource set matches '{}'",
                style("warning:").yellow().bold(),
                selector
            );
        }
    }

    let output = Engine::default().render(&context, &opts.include, &opts.exclude);

    tracing::debug!(
        context = %context.name,
        sets = output.sets.len(),
        "rendered resource sets"
    );

    if output.report.has_errors() {
        display::display_render_report(&output.report, opts.debug);
    }

    Ok((context, output))
}

/// Final exit status of a run
///
/// Template failures were already shown as warnings; they only fail the
/// run with `--strict`.
pub(crate) fn finish(report: &RenderReport, strict: bool) -> Result<()> {
    if strict && report.has_errors() {
        return Err(CliError::Template {
            failed: report.failed_files(),
        });
    }
    Ok(())
}
