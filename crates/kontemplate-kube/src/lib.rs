//! Kontemplate Kube - hands rendered resource sets to the cluster
//!
//! Resource sets are dispatched strictly in order by piping their rendered
//! text into `kubectl` or `helm`. The first failing invocation aborts the
//! whole run; nothing is retried or rolled back.

pub mod dispatch;
pub mod error;
pub mod mode;
pub mod process;

pub use dispatch::{DispatchSummary, Dispatcher, SkipReason, Tools};
pub use error::{KubeError, Result};
pub use mode::DispatchMode;
pub use process::{ProcessRunner, ProcessStatus, RunningProcess, SystemRunner};
