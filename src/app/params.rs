//! Parameter file loading with command-line overrides.

use anyhow::{Context, Result};
use std::path::Path;
use superboids_core::Parameters;

/// Values given on the command line that replace the file's.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Overrides {
    pub steps: Option<u64>,
    pub threads: Option<usize>,
    pub seed: Option<u64>,
}

impl Overrides {
    pub fn apply(&self, params: &mut Parameters) {
        if let Some(steps) = self.steps {
            params.run.steps = steps;
        }
        if let Some(threads) = self.threads {
            params.run.threads = threads;
        }
        if let Some(seed) = self.seed {
            params.run.seed = Some(seed);
        }
    }
}

/// Reads `path` (defaults when `None`), applies `overrides` and validates
/// the result.
pub fn load_parameters(path: Option<&Path>, overrides: Overrides) -> Result<Parameters> {
    let mut params = match path {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            Parameters::from_toml(&content).with_context(|| format!("parsing {}", path.display()))?
        }
        None => Parameters::default(),
    };
    overrides.apply(&mut params);
    params.validate().context("parameters after command-line overrides")?;
    Ok(params)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_without_file() {
        let params = load_parameters(None, Overrides::default()).unwrap();
        assert_eq!(params.run.steps, 10_000);
    }

    #[test]
    fn test_overrides_replace_file_values() {
        let path = std::env::temp_dir().join(format!("superboids_params_{}.toml", std::process::id()));
        std::fs::write(&path, "[run]\nsteps = 50\nthreads = 2\n").unwrap();
        let overrides = Overrides {
            steps: Some(7),
            threads: None,
            seed: Some(9),
        };
        let params = load_parameters(Some(&path), overrides).unwrap();
        assert_eq!(params.run.steps, 7);
        assert_eq!(params.run.threads, 2);
        assert_eq!(params.run.seed, Some(9));
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_invalid_override_is_rejected() {
        let overrides = Overrides {
            threads: Some(0),
            ..Overrides::default()
        };
        assert!(load_parameters(None, overrides).is_err());
    }

    #[test]
    fn test_missing_file_names_path() {
        let err = load_parameters(Some(Path::new("/nonexistent/run.toml")), Overrides::default())
            .unwrap_err();
        assert!(format!("{err:#}").contains("/nonexistent/run.toml"));
    }
}
