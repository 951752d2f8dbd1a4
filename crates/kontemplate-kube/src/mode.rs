//! Dispatch modes and their argument templates

/// What the external tools are asked to do with a resource set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchMode {
    /// Create or update resources
    Apply { dry_run: bool },
    /// Replace existing resources
    Replace,
    /// Delete resources
    Delete,
    /// Create resources that must not exist yet
    Create,
}

impl DispatchMode {
    /// Leading kubectl arguments; manifests are read from stdin
    pub fn kubectl_args(&self) -> Vec<String> {
        let args: &[&str] = match self {
            Self::Apply { dry_run: false } => &["apply", "-f", "-"],
            Self::Apply { dry_run: true } => &["apply", "-f", "-", "--dry-run"],
            Self::Replace => &["replace", "--save-config=true", "-f", "-"],
            Self::Delete => &["delete", "-f", "-"],
            Self::Create => &["create", "--save-config=true", "-f", "-"],
        };
        to_owned(args)
    }

    /// Leading helm arguments; values are read from stdin
    ///
    /// `None` when helm has no equivalent, in which case helm sets are
    /// skipped.
    pub fn helm_args(&self) -> Option<Vec<String>> {
        let args: &[&str] = match self {
            Self::Apply { dry_run: false } => &["upgrade", "-i", "-f", "-"],
            Self::Apply { dry_run: true } => &["upgrade", "-i", "-f", "-", "--dry-run"],
            Self::Replace => &["upgrade", "-i", "--force", "-f", "-"],
            Self::Create => &["install", "-f", "-"],
            Self::Delete => return None,
        };
        Some(to_owned(args))
    }

    /// Whether helm repositories are registered before dispatching
    pub fn registers_repositories(&self) -> bool {
        !matches!(self, Self::Delete)
    }
}

impl std::fmt::Display for DispatchMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Apply { dry_run: false } => write!(f, "apply"),
            Self::Apply { dry_run: true } => write!(f, "apply (dry-run)"),
            Self::Replace => write!(f, "replace"),
            Self::Delete => write!(f, "delete"),
            Self::Create => write!(f, "create"),
        }
    }
}

fn to_owned(args: &[&str]) -> Vec<String> {
    args.iter().map(|s| s.to_string()).collect()
}
