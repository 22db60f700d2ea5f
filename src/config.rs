//! Workspace configuration
//!
//! Reads `.garnet.json` from the workspace root (all fields optional) and
//! computes the authoritative workspace file set. A missing or malformed
//! config file degrades to defaults with a logged warning; configuration
//! problems never surface as errors.

use std::fs;
use std::path::{Path, PathBuf};

use glob::Pattern;
use serde::Deserialize;
use tracing::{debug, warn};
use walkdir::WalkDir;

pub const CONFIG_FILE: &str = ".garnet.json";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
struct RawConfig {
    include: Vec<String>,
    exclude: Vec<String>,
    required: Vec<String>,
    domains: Vec<String>,
    max_files: usize,
}

impl Default for RawConfig {
    fn default() -> Self {
        RawConfig {
            // an empty include list means every .rb file
            include: Vec::new(),
            exclude: vec![
                "spec/**/*".to_string(),
                "test/**/*".to_string(),
                "vendor/**/*".to_string(),
            ],
            required: Vec::new(),
            domains: Vec::new(),
            max_files: 5000,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    workspace: Option<PathBuf>,
    raw: RawConfig,
}

impl Config {
    /// Loads the configuration for a workspace directory, or an empty
    /// configuration when no workspace is given.
    pub fn load(workspace: Option<&Path>) -> Config {
        let raw = match workspace {
            Some(dir) => {
                let path = dir.join(CONFIG_FILE);
                match fs::read_to_string(&path) {
                    Ok(text) => match serde_json::from_str(&text) {
                        Ok(raw) => raw,
                        Err(err) => {
                            warn!("invalid {}: {}", path.display(), err);
                            RawConfig::default()
                        }
                    },
                    Err(_) => RawConfig::default(),
                }
            }
            None => RawConfig::default(),
        };
        Config {
            workspace: workspace.map(Path::to_path_buf),
            raw,
        }
    }

    pub fn workspace(&self) -> Option<&Path> {
        self.workspace.as_deref()
    }

    /// Path of the config file governing this workspace, when one applies.
    pub fn config_file(&self) -> Option<PathBuf> {
        self.workspace.as_ref().map(|w| w.join(CONFIG_FILE))
    }

    /// The authoritative workspace file list: every source file under the
    /// workspace matching the include globs (all `.rb` files when no
    /// includes are configured) and none of the excludes, sorted for
    /// stable iteration, capped at `max_files`.
    pub fn calculated(&self) -> Vec<String> {
        let Some(workspace) = &self.workspace else {
            return Vec::new();
        };
        let includes: Vec<Pattern> = compile_patterns(&self.raw.include);
        let excludes: Vec<Pattern> = compile_patterns(&self.raw.exclude);

        let mut files = Vec::new();
        for entry in WalkDir::new(workspace)
            .follow_links(false)
            .into_iter()
            .filter_map(Result::ok)
        {
            if !entry.file_type().is_file() {
                continue;
            }
            let Ok(relative) = entry.path().strip_prefix(workspace) else {
                continue;
            };
            let included = if includes.is_empty() {
                relative.extension().map(|e| e == "rb").unwrap_or(false)
            } else {
                includes.iter().any(|p| p.matches_path(relative))
            };
            if !included {
                continue;
            }
            if excludes.iter().any(|p| p.matches_path(relative)) {
                continue;
            }
            files.push(entry.path().to_string_lossy().to_string());
        }
        files.sort();
        if files.len() > self.raw.max_files {
            warn!(
                "workspace has {} matching files, indexing the first {}",
                files.len(),
                self.raw.max_files
            );
            files.truncate(self.raw.max_files);
        }
        debug!("workspace file set: {} files", files.len());
        files
    }

    pub fn required(&self) -> &[String] {
        &self.raw.required
    }

    pub fn domains(&self) -> &[String] {
        &self.raw.domains
    }

    /// Directories searched for documentation archives, in priority order:
    /// `$GARNET_DOCS` first, then `.garnet/docs` under the workspace.
    pub fn doc_dirs(&self) -> Vec<PathBuf> {
        let mut dirs = Vec::new();
        if let Ok(env_dir) = std::env::var("GARNET_DOCS") {
            if !env_dir.is_empty() {
                dirs.push(PathBuf::from(env_dir));
            }
        }
        if let Some(workspace) = &self.workspace {
            dirs.push(workspace.join(".garnet").join("docs"));
        }
        dirs
    }
}

fn compile_patterns(raw: &[String]) -> Vec<Pattern> {
    raw.iter()
        .filter_map(|p| match Pattern::new(p) {
            Ok(pattern) => Some(pattern),
            Err(err) => {
                warn!("ignoring malformed glob {:?}: {}", p, err);
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_calculated_respects_excludes() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("lib")).unwrap();
        fs::create_dir_all(dir.path().join("spec")).unwrap();
        fs::write(dir.path().join("lib/app.rb"), "class App; end").unwrap();
        fs::write(dir.path().join("spec/app_spec.rb"), "describe 'x'").unwrap();
        fs::write(dir.path().join("README.md"), "# readme").unwrap();

        let config = Config::load(Some(dir.path()));
        let files = config.calculated();
        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("app.rb"));
    }

    #[test]
    fn test_malformed_config_degrades_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(CONFIG_FILE), "{not json").unwrap();
        let config = Config::load(Some(dir.path()));
        assert!(config.required().is_empty());
        assert!(config.domains().is_empty());
    }

    #[test]
    fn test_config_reads_required_and_domains() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(CONFIG_FILE),
            r#"{"required": ["json"], "domains": ["Helpers"]}"#,
        )
        .unwrap();
        let config = Config::load(Some(dir.path()));
        assert_eq!(config.required(), ["json".to_string()]);
        assert_eq!(config.domains(), ["Helpers".to_string()]);
    }

    #[test]
    fn test_no_workspace_has_no_files() {
        let config = Config::load(None);
        assert!(config.calculated().is_empty());
        assert!(config.config_file().is_none());
    }
}
