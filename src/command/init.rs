use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use std::path::Path;
use std::process::ExitCode;

/// Write a template config for the user to fill in.
pub fn run(config: Option<&Path>, force: bool) -> Result<ExitCode> {
    let path = match config {
        Some(path) => path.to_path_buf(),
        None => ferry_config::default_path().or_raise(|| ErrorKind::Config)?,
    };
    ferry_config::write_template(&path, force).or_raise(|| ErrorKind::Config)?;
    println!("{}", path.display());
    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_refuses_to_overwrite() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        assert_eq!(run(Some(&path), false).unwrap(), ExitCode::SUCCESS);
        assert!(path.is_file());
        assert!(run(Some(&path), false).is_err());
        assert_eq!(run(Some(&path), true).unwrap(), ExitCode::SUCCESS);
    }
}
