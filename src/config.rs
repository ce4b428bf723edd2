use anyhow::{Context, Result};
use editorial_core::tree::DanglingPolicy;
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub scraper: ScraperConfig,
    #[serde(default)]
    pub import: ImportConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ScraperConfig {
    pub results_dir: PathBuf,
    #[serde(default = "default_include_globs")]
    pub include_globs: Vec<String>,
    #[serde(default)]
    pub exclude_globs: Vec<String>,
    #[serde(default)]
    pub follow_symlinks: bool,
    /// Portraits named `<slug>.<ext>`; unset means records carry no photo.
    #[serde(default)]
    pub images_dir: Option<PathBuf>,
}

fn default_include_globs() -> Vec<String> {
    vec!["*.json".to_string()]
}

#[derive(Debug, Deserialize, Clone)]
pub struct ImportConfig {
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    #[serde(default = "default_wikipedia_prefix")]
    pub wikipedia_prefix: String,
    #[serde(default)]
    pub dangling: DanglingPolicy,
    #[serde(default = "default_verify")]
    pub verify: bool,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            wikipedia_prefix: default_wikipedia_prefix(),
            dangling: DanglingPolicy::default(),
            verify: default_verify(),
        }
    }
}

fn default_concurrency() -> usize {
    20
}
fn default_wikipedia_prefix() -> String {
    "https://en.wikipedia.org/wiki/".to_string()
}
fn default_verify() -> bool {
    true
}

#[derive(Debug, Deserialize, Clone)]
pub struct OutputConfig {
    pub dir: PathBuf,
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    if config.import.concurrency == 0 {
        anyhow::bail!("import.concurrency must be > 0");
    }

    if config.import.wikipedia_prefix.is_empty() {
        anyhow::bail!("import.wikipedia_prefix must not be empty");
    }

    if config.scraper.include_globs.is_empty() {
        anyhow::bail!("scraper.include_globs must list at least one pattern");
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &TempDir, body: &str) -> PathBuf {
        let path = dir.path().join("edimport.toml");
        std::fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn minimal_config_uses_defaults() {
        let tmp = TempDir::new().unwrap();
        let path = write(
            &tmp,
            r#"
[scraper]
results_dir = "scraper/output"

[output]
dir = "data"
"#,
        );
        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.scraper.include_globs, vec!["*.json"]);
        assert_eq!(cfg.import.concurrency, 20);
        assert_eq!(cfg.import.dangling, DanglingPolicy::Warn);
        assert!(cfg.import.verify);
        assert!(cfg.scraper.images_dir.is_none());
        assert_eq!(
            cfg.import.wikipedia_prefix,
            "https://en.wikipedia.org/wiki/"
        );
    }

    #[test]
    fn dangling_policy_is_read() {
        let tmp = TempDir::new().unwrap();
        let path = write(
            &tmp,
            r#"
[scraper]
results_dir = "in"
images_dir = "in/images"

[import]
dangling = "reject"
concurrency = 4

[output]
dir = "out"
"#,
        );
        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.import.dangling, DanglingPolicy::Reject);
        assert_eq!(cfg.import.concurrency, 4);
        assert_eq!(cfg.scraper.images_dir, Some(PathBuf::from("in/images")));
    }

    #[test]
    fn rejects_zero_concurrency() {
        let tmp = TempDir::new().unwrap();
        let path = write(
            &tmp,
            r#"
[scraper]
results_dir = "in"

[import]
concurrency = 0

[output]
dir = "out"
"#,
        );
        let err = load_config(&path).unwrap_err();
        assert!(err.to_string().contains("concurrency"));
    }

    #[test]
    fn rejects_unknown_policy() {
        let tmp = TempDir::new().unwrap();
        let path = write(
            &tmp,
            r#"
[scraper]
results_dir = "in"

[import]
dangling = "explode"

[output]
dir = "out"
"#,
        );
        assert!(load_config(&path).is_err());
    }

    #[test]
    fn missing_file_names_the_path() {
        let err = load_config(Path::new("/nonexistent/edimport.toml")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/edimport.toml"));
    }
}
