//! Process runner abstraction
//!
//! The dispatcher only needs to start a program, stream text into its stdin
//! and wait for it. Keeping that behind a trait lets tests swap in a fake
//! runner instead of spawning real binaries.

use std::io::{self, Write};
use std::path::Path;
use std::process::{Child, Command, Stdio};

/// Exit status of a finished process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessStatus {
    /// Exit code, `None` when the process was killed by a signal
    pub code: Option<i32>,
}

impl ProcessStatus {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Starts external processes
pub trait ProcessRunner {
    /// Start `program` with `args`, stdin piped, stdout and stderr inherited
    fn start(&mut self, program: &Path, args: &[String]) -> io::Result<Box<dyn RunningProcess>>;
}

/// A started process
pub trait RunningProcess {
    /// Take the writable end of the process's stdin
    ///
    /// Dropping the returned handle closes the stream. Returns `None` once
    /// the handle has been taken.
    fn take_input(&mut self) -> Option<Box<dyn Write>>;

    /// Block until the process exits
    fn wait(self: Box<Self>) -> io::Result<ProcessStatus>;
}

/// Runner spawning real child processes
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl ProcessRunner for SystemRunner {
    fn start(&mut self, program: &Path, args: &[String]) -> io::Result<Box<dyn RunningProcess>> {
        let child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .spawn()?;

        Ok(Box::new(SystemProcess { child }))
    }
}

struct SystemProcess {
    child: Child,
}

impl RunningProcess for SystemProcess {
    fn take_input(&mut self) -> Option<Box<dyn Write>> {
        self.child
            .stdin
            .take()
            .map(|stdin| Box::new(stdin) as Box<dyn Write>)
    }

    fn wait(mut self: Box<Self>) -> io::Result<ProcessStatus> {
        // Close stdin if nobody took it, otherwise the child may never exit
        drop(self.child.stdin.take());
        let status = self.child.wait()?;
        Ok(ProcessStatus {
            code: status.code(),
        })
    }
}
