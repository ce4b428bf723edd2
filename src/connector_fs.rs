use anyhow::{bail, Result};
use globset::{Glob, GlobBuilder, GlobSet, GlobSetBuilder};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::config::Config;

/// A scraper result file found on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultFile {
    pub path: PathBuf,
    /// Path relative to the results directory, `/`-separated.
    pub relative: String,
}

impl ResultFile {
    /// File name without extension, kept as the record's old slug.
    pub fn stem(&self) -> String {
        self.path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default()
    }
}

pub fn scan_results(config: &Config) -> Result<Vec<ResultFile>> {
    let scraper = &config.scraper;

    let root = &scraper.results_dir;
    if !root.exists() {
        bail!(
            "Scraper results directory does not exist: {}",
            root.display()
        );
    }

    let include_set = build_globset(&scraper.include_globs)?;
    let exclude_set = build_globset(&scraper.exclude_globs)?;

    let mut files = Vec::new();

    let walker = WalkDir::new(root).follow_links(scraper.follow_symlinks);
    for entry in walker {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let relative = path.strip_prefix(root).unwrap_or(path);
        let rel_str = relative.to_string_lossy().replace('\\', "/");

        if exclude_set.is_match(&rel_str) {
            continue;
        }

        if !include_set.is_match(&rel_str) {
            continue;
        }

        files.push(ResultFile {
            path: path.to_path_buf(),
            relative: rel_str,
        });
    }

    // Sort for deterministic ordering
    files.sort_by(|a, b| a.relative.cmp(&b.relative));

    Ok(files)
}

/// Relative path of the first file named `<slug>.<ext>` under `images_dir`.
///
/// Glob metacharacters in the slug match literally. A missing directory has
/// no photos.
pub fn find_photo(images_dir: &Path, slug: &str) -> Result<Option<String>> {
    if !images_dir.is_dir() {
        return Ok(None);
    }

    let matcher = GlobBuilder::new(&format!("{}.*", globset::escape(slug)))
        .literal_separator(true)
        .backslash_escape(false)
        .build()?
        .compile_matcher();

    let depth = slug.matches('/').count() + 1;
    let mut found = Vec::new();
    for entry in WalkDir::new(images_dir).min_depth(depth).max_depth(depth) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let relative = path.strip_prefix(images_dir).unwrap_or(path);
        let rel_str = relative.to_string_lossy().replace('\\', "/");
        if matcher.is_match(&rel_str) {
            found.push(rel_str);
        }
    }

    Ok(found.into_iter().min())
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ImportConfig, OutputConfig, ScraperConfig};
    use std::fs;
    use tempfile::TempDir;

    fn config(root: PathBuf, include: &[&str], exclude: &[&str]) -> Config {
        Config {
            scraper: ScraperConfig {
                results_dir: root,
                include_globs: include.iter().map(|s| s.to_string()).collect(),
                exclude_globs: exclude.iter().map(|s| s.to_string()).collect(),
                follow_symlinks: false,
                images_dir: None,
            },
            import: ImportConfig::default(),
            output: OutputConfig {
                dir: PathBuf::from("unused"),
            },
        }
    }

    #[test]
    fn finds_json_files_sorted() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("b.json"), "{}").unwrap();
        fs::write(tmp.path().join("a.json"), "{}").unwrap();
        fs::write(tmp.path().join("notes.txt"), "").unwrap();

        let files = scan_results(&config(tmp.path().to_path_buf(), &["*.json"], &[])).unwrap();
        let names: Vec<&str> = files.iter().map(|f| f.relative.as_str()).collect();
        assert_eq!(names, vec!["a.json", "b.json"]);
        assert_eq!(files[0].stem(), "a");
    }

    #[test]
    fn exclude_wins_over_include() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("drafts")).unwrap();
        fs::write(tmp.path().join("keep.json"), "{}").unwrap();
        fs::write(tmp.path().join("drafts/skip.json"), "{}").unwrap();

        let files = scan_results(&config(
            tmp.path().to_path_buf(),
            &["**/*.json"],
            &["drafts/**"],
        ))
        .unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].relative, "keep.json");
    }

    #[test]
    fn photo_is_first_match_by_name() {
        let tmp = TempDir::new().unwrap();
        for name in ["Ada_Lovelace.png", "Ada_Lovelace.jpg", "Ada_Lovelace_2.jpg"] {
            fs::write(tmp.path().join(name), "").unwrap();
        }
        assert_eq!(
            find_photo(tmp.path(), "Ada_Lovelace").unwrap().as_deref(),
            Some("Ada_Lovelace.jpg")
        );
        assert_eq!(find_photo(tmp.path(), "Grace_Hopper").unwrap(), None);
        assert_eq!(find_photo(&tmp.path().join("nope"), "Ada_Lovelace").unwrap(), None);
    }

    #[test]
    fn photo_slug_metacharacters_are_literal() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("Whats.jpg"), "").unwrap();
        fs::write(tmp.path().join("Ab.jpg"), "").unwrap();
        assert_eq!(find_photo(tmp.path(), "What?").unwrap(), None);
        assert_eq!(find_photo(tmp.path(), "[AB]b").unwrap(), None);

        fs::write(tmp.path().join("What?.jpg"), "").unwrap();
        assert_eq!(
            find_photo(tmp.path(), "What?").unwrap().as_deref(),
            Some("What?.jpg")
        );
    }

    #[test]
    fn missing_root_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let err = scan_results(&config(tmp.path().join("nope"), &["*.json"], &[])).unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }
}
