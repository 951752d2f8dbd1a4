//! Version command

/// Git commit recorded at build time, if any
const GIT_HASH: Option<&str> = option_env!("KONTEMPLATE_GIT_HASH");

pub fn run() {
    println!("{}", version_line());
}

fn version_line() -> String {
    format!(
        "Kontemplate version {} (git commit {})",
        env!("CARGO_PKG_VERSION"),
        GIT_HASH.unwrap_or("unknown")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_line() {
        let line = version_line();
        assert!(line.starts_with(&format!("Kontemplate version {}", env!("CARGO_PKG_VERSION"))));
        assert!(line.contains("(git commit "));
    }
}
