//! Sample configuration command

use std::path::PathBuf;

use crate::cli::error::CliError;
use crate::database::config::sample_config;

/// Config command arguments
#[derive(Debug, Clone)]
pub struct ConfigArgs {
    /// Write the sample to this file instead of printing it
    pub output: Option<PathBuf>,
    /// Overwrite an existing file
    pub force: bool,
}

/// Print or write the sample configuration file
pub fn handle_config(args: &ConfigArgs) -> Result<(), CliError> {
    match &args.output {
        None => {
            print!("{}", sample_config());
            Ok(())
        }
        Some(path) => {
            if path.exists() && !args.force {
                return Err(CliError::InvalidArgument(format!(
                    "{} already exists. Use --force to overwrite.",
                    path.display()
                )));
            }
            std::fs::write(path, sample_config())
                .map_err(|e| CliError::IoError(format!("{}: {}", path.display(), e)))?;
            println!("Wrote {}", path.display());
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_write_sample_config() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("dir-to-db.toml");
        let args = ConfigArgs {
            output: Some(path.clone()),
            force: false,
        };

        handle_config(&args).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), sample_config());

        assert!(matches!(
            handle_config(&args),
            Err(CliError::InvalidArgument(_))
        ));
        handle_config(&ConfigArgs {
            output: Some(path),
            force: true,
        })
        .unwrap();
    }
}
