use anyhow::{bail, Context, Result};
use lectern::config::Config;
use std::path::{Path, PathBuf};

const CONFIG_FILE: &str = "lectern.toml";

/// Write a default configuration file into `dir`
pub fn init_config(dir: &Path, force: bool) -> Result<PathBuf> {
    let config_path = dir.join(CONFIG_FILE);
    if config_path.exists() && !force {
        bail!(
            "{} already exists (use --force to overwrite)",
            config_path.display()
        );
    }

    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create {}", dir.display()))?;

    let header = "# Lectern configuration\n\
                  # [embedding] backend: \"http\" (OpenAI-compatible) or \"hash\" (offline, non-semantic)\n\
                  # [store] kind: \"chroma\" or \"memory\" (JSONL snapshot at `path`)\n\n";
    let body = Config::default().to_toml()?;
    std::fs::write(&config_path, format!("{}{}", header, body))
        .with_context(|| format!("Failed to write {}", config_path.display()))?;

    println!("Created configuration file: {}", config_path.display());
    Ok(config_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_writes_loadable_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = init_config(dir.path(), false).unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.retrieval.default_k, 6);
        assert_eq!(config.retrieval.rrf_k, 60);
    }

    #[test]
    fn test_init_refuses_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        init_config(dir.path(), false).unwrap();
        assert!(init_config(dir.path(), false).is_err());
        assert!(init_config(dir.path(), true).is_ok());
    }
}
