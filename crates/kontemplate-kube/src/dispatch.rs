//! Sequential dispatch of rendered resource sets to kubectl and helm

use kontemplate_core::{Context, ResourceSetKind};
use kontemplate_engine::{RenderedResource, RenderedResourceSet};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::{KubeError, Result};
use crate::process::{ProcessRunner, SystemRunner};

/// Paths of the external binaries
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tools {
    pub kubectl: PathBuf,
    pub helm: PathBuf,
}

impl Default for Tools {
    fn default() -> Self {
        Self {
            kubectl: PathBuf::from("kubectl"),
            helm: PathBuf::from("helm"),
        }
    }
}

/// Why a resource set was not handed to any tool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Nothing was rendered for the set
    Empty,
    /// Helm set under an operation without a helm equivalent
    Unsupported,
}

/// What happened to each resource set during a dispatch
///
/// Skipped sets are only logged at debug level here; callers report them
/// to the user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchSummary {
    /// Sets handed to an external tool, in order
    pub dispatched: Vec<String>,
    /// Sets left alone, in order
    pub skipped: Vec<(String, SkipReason)>,
}

/// Hands rendered resource sets to kubectl and helm, one at a time
pub struct Dispatcher<R: ProcessRunner = SystemRunner> {
    tools: Tools,
    runner: R,
}

impl Dispatcher<SystemRunner> {
    /// Dispatcher spawning real processes
    pub fn new(tools: Tools) -> Self {
        Self::with_runner(tools, SystemRunner)
    }
}

impl<R: ProcessRunner> Dispatcher<R> {
    pub fn with_runner(tools: Tools, runner: R) -> Self {
        Self { tools, runner }
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Register every helm repository of the context
    ///
    /// Stops at the first repository helm refuses.
    pub fn setup_helm_repositories(&mut self, context: &Context) -> Result<()> {
        for repo in &context.helm_repositories {
            tracing::debug!(
                repository = %repo.name,
                url = %repo.url,
                "registering helm repository"
            );
            let args = vec![
                "repo".to_string(),
                "add".to_string(),
                repo.name.clone(),
                repo.url.clone(),
            ];
            let helm = self.tools.helm.clone();
            self.run(&helm, &args, &[])?;
        }
        Ok(())
    }

    /// Dispatch resource sets in order, stopping at the first failure
    ///
    /// `helm_args` of `None` means the operation has no helm equivalent and
    /// helm sets are skipped. Sets without rendered resources are skipped
    /// as well; both end up in the returned summary.
    pub fn apply(
        &mut self,
        context: &Context,
        kubectl_args: &[String],
        helm_args: Option<&[String]>,
        sets: &[RenderedResourceSet],
    ) -> Result<DispatchSummary> {
        let mut summary = DispatchSummary::default();

        for set in sets {
            if set.is_empty() {
                tracing::debug!(resource_set = %set.name, "nothing rendered, skipping");
                summary.skipped.push((set.name.clone(), SkipReason::Empty));
                continue;
            }

            let (program, args) = match set.kind {
                ResourceSetKind::Kubectl => {
                    let mut args = kubectl_args.to_vec();
                    args.push(format!("--context={}", context.name));
                    args.extend(set.args.iter().cloned());
                    (self.tools.kubectl.clone(), args)
                }
                ResourceSetKind::Helm => {
                    let Some(helm_args) = helm_args else {
                        tracing::debug!(resource_set = %set.name, "no helm operation, skipping");
                        summary.skipped.push((set.name.clone(), SkipReason::Unsupported));
                        continue;
                    };

                    let mut args = helm_args.to_vec();
                    args.push(format!("--kube-context={}", context.name));
                    args.push(set.name.clone());
                    args.extend(set.chart.iter().cloned());
                    args.extend(set.args.iter().cloned());
                    (self.tools.helm.clone(), args)
                }
            };

            tracing::debug!(
                resource_set = %set.name,
                resources = set.resources.len(),
                "dispatching to {}",
                program.display()
            );
            self.run(&program, &args, &set.resources)?;
            summary.dispatched.push(set.name.clone());
        }

        Ok(summary)
    }

    /// Start a tool, stream resources into its stdin and wait for it
    fn run(
        &mut self,
        program: &Path,
        args: &[String],
        resources: &[RenderedResource],
    ) -> Result<()> {
        let command = command_line(program, args);

        let mut process = self
            .runner
            .start(program, args)
            .map_err(|source| KubeError::Launch {
                command: command.clone(),
                source,
            })?;

        let written = match process.take_input() {
            Some(mut input) => write_resources(input.as_mut(), resources),
            None => Ok(()),
        };

        // The input handle is gone at this point, so the child sees EOF
        let status = process.wait().map_err(|source| KubeError::Wait {
            command: command.clone(),
            source,
        })?;

        if let Err(source) = written {
            return Err(KubeError::Input { command, source });
        }

        match status.code {
            Some(0) => Ok(()),
            Some(code) => Err(KubeError::Exit { command, code }),
            None => Err(KubeError::Signalled { command }),
        }
    }
}

fn write_resources(input: &mut dyn Write, resources: &[RenderedResource]) -> std::io::Result<()> {
    for resource in resources {
        input.write_all(resource.rendered.as_bytes())?;
        input.write_all(b"\n")?;
    }
    input.flush()
}

fn command_line(program: &Path, args: &[String]) -> String {
    let mut line = program.display().to_string();
    for arg in args {
        line.push(' ');
        line.push_str(arg);
    }
    line
}
