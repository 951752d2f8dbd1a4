//! Apply, replace, create and delete commands
//!
//! All four render the configuration and hand the result to kubectl and
//! helm; they only differ in the arguments given to the tools.

use console::style;
use kontemplate_kube::{DispatchMode, Dispatcher};
use std::path::Path;

use crate::GlobalOptions;
use crate::display::warn_skipped;
use crate::error::Result;

pub fn run(file: &Path, mode: DispatchMode, opts: &GlobalOptions) -> Result<()> {
    let (context, output) = super::load_and_render(file, opts)?;

    let mut dispatcher = Dispatcher::new(opts.tools());

    if mode.registers_repositories() {
        dispatcher.setup_helm_repositories(&context)?;
    }

    let kubectl_args = mode.kubectl_args();
    let helm_args = mode.helm_args();
    let summary = dispatcher.apply(&context, &kubectl_args, helm_args.as_deref(), &output.sets)?;

    for (name, reason) in &summary.skipped {
        warn_skipped(name, *reason, Some(mode));
    }

    eprintln!(
        "{} {} resource set(s) to context {} ({})",
        style("Dispatched").green().bold(),
        summary.dispatched.len(),
        style(&context.name).cyan(),
        mode
    );

    super::finish(&output.report, opts.strict)
}
