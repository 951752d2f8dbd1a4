//! Template command - render resource sets without touching the cluster

use console::style;
use kontemplate_engine::RenderedResourceSet;
use kontemplate_kube::SkipReason;
use std::fs;
use std::path::{Path, PathBuf};

use crate::GlobalOptions;
use crate::display::warn_skipped;
use crate::error::{CliError, Result};

pub fn run(file: &Path, output_dir: Option<&Path>, opts: &GlobalOptions) -> Result<()> {
    let (_, output) = super::load_and_render(file, opts)?;

    match output_dir {
        Some(dir) => write_to_directory(dir, &output.sets)?,
        None => print_sets(&output.sets),
    }

    super::finish(&output.report, opts.strict)
}

fn print_sets(sets: &[RenderedResourceSet]) {
    for set in sets {
        if set.is_empty() {
            warn_skipped(&set.name, SkipReason::Empty, None);
            continue;
        }

        for resource in &set.resources {
            eprintln!(
                "{} {}/{}:",
                style("Rendered file").green(),
                set.name,
                resource.filename
            );
            println!("{}", resource.rendered);
        }
    }
}

fn write_to_directory(dir: &Path, sets: &[RenderedResourceSet]) -> Result<()> {
    fs::create_dir_all(dir).map_err(|e| CliError::io(dir, e))?;

    for set in sets {
        if set.is_empty() {
            warn_skipped(&set.name, SkipReason::Empty, None);
            continue;
        }

        for resource in &set.resources {
            let path = output_path(dir, &set.name, &resource.filename);
            fs::write(&path, &resource.rendered).map_err(|e| CliError::io(&path, e))?;
            eprintln!("{} {}", style("wrote").green(), path.display());
        }
    }

    Ok(())
}

/// `web/frontend` + `deployment.yaml` -> `<dir>/web-frontend-deployment.yaml`
fn output_path(dir: &Path, set_name: &str, filename: &str) -> PathBuf {
    dir.join(format!("{}-{}", set_name.replace('/', "-"), filename))
}
