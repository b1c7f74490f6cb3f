//! Layered configuration for mediadex.
//!
//! Sources, lowest precedence first:
//! 1. Built-in defaults (cache regions and database under the platform cache
//!    and data directories).
//! 2. `mediadex.toml` in the platform configuration directory, if present.
//! 3. An explicitly given file: `.toml`, `.yaml`/`.yml` or `.json`.
//! 4. `MEDIADEX_*` environment variables, with `__` separating nested keys
//!    (`MEDIADEX_CACHE__TRASH=/srv/trash`).

pub mod error;

use crate::error::{ErrorKind, Result};
use directories::ProjectDirs;
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const APPLICATION: &str = "mediadex";
const ENV_PREFIX: &str = "MEDIADEX_";
const FILE_NAME: &str = "mediadex.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Absolute directories whose contents are cataloged.
    pub roots: Vec<PathBuf>,
    /// Path of the SQLite catalog.
    pub database: PathBuf,
    /// Concurrent extraction tasks per sync pass.
    pub workers: usize,
    /// Playback rate assumed for animated images.
    pub animated_fps: f64,
    /// Move deleted folders and files into the trash region instead of
    /// removing them.
    pub soft_delete: bool,
    pub trash_retention_days: u64,
    pub cache: CacheConfig,
    /// `ffprobe` binary used for videos. Looked up on the `PATH` when unset.
    pub ffprobe: Option<PathBuf>,
}

/// Filesystem-backed cache regions. None of these are cataloged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub trash: PathBuf,
    /// Zip bundles being prepared for download.
    pub staging: PathBuf,
    pub thumbnails: PathBuf,
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", APPLICATION)
}

impl Default for CacheConfig {
    fn default() -> Self {
        let base = project_dirs()
            .map(|dirs| dirs.cache_dir().to_path_buf())
            .unwrap_or_else(|| std::env::temp_dir().join(APPLICATION));
        Self {
            trash: base.join("trash"),
            staging: base.join("staging"),
            thumbnails: base.join("thumbnails"),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let database = project_dirs()
            .map(|dirs| dirs.data_dir().join("catalog.sqlite"))
            .unwrap_or_else(|| std::env::temp_dir().join(APPLICATION).join("catalog.sqlite"));
        Self {
            roots: Vec::new(),
            database,
            workers: 4,
            animated_fps: 8.0,
            soft_delete: true,
            trash_retention_days: 30,
            cache: CacheConfig::default(),
            ffprobe: None,
        }
    }
}

impl Config {
    /// Load and validate configuration from every source.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        Self::from_figment(Self::figment(explicit)?)
    }

    /// Assemble the layered sources without extracting them.
    pub fn figment(explicit: Option<&Path>) -> Result<Figment> {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        if let Some(dirs) = project_dirs() {
            let global = dirs.config_dir().join(FILE_NAME);
            if global.is_file() {
                tracing::debug!(path = %global.display(), "Using global configuration file");
                figment = figment.merge(Toml::file(global));
            }
        }
        if let Some(path) = explicit {
            if !path.is_file() {
                exn::bail!(ErrorKind::NotFound(path.to_path_buf()));
            }
            let extension = path.extension().and_then(|e| e.to_str()).map(str::to_lowercase);
            figment = match extension.as_deref() {
                Some("toml") => figment.merge(Toml::file(path)),
                Some("yaml" | "yml") => figment.merge(Yaml::file(path)),
                Some("json") => figment.merge(Json::file(path)),
                _ => exn::bail!(ErrorKind::UnsupportedFormat(path.to_path_buf())),
            };
        }
        Ok(figment.merge(Env::prefixed(ENV_PREFIX).split("__")))
    }

    pub fn from_figment(figment: Figment) -> Result<Self> {
        let config: Self = figment.extract().or_raise(|| ErrorKind::Load)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.roots.is_empty() {
            exn::bail!(ErrorKind::Invalid(String::from("at least one root is required")));
        }
        if let Some(root) = self.roots.iter().find(|r| !r.is_absolute()) {
            exn::bail!(ErrorKind::Invalid(format!("root must be an absolute path: {}", root.display())));
        }
        if self.workers == 0 {
            exn::bail!(ErrorKind::Invalid(String::from("workers must be at least 1")));
        }
        if !self.animated_fps.is_finite() || self.animated_fps <= 0.0 {
            exn::bail!(ErrorKind::Invalid(format!("animated_fps must be positive, found {}", self.animated_fps)));
        }
        Ok(())
    }

    /// Paths below the roots that must never be cataloged or shown as
    /// folders: the cache regions.
    pub fn excluded_dirs(&self) -> Vec<PathBuf> {
        vec![self.cache.trash.clone(), self.cache.staging.clone(), self.cache.thumbnails.clone()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn from_toml(toml: &str) -> Result<Config> {
        Config::from_figment(Figment::from(Serialized::defaults(Config::default())).merge(Toml::string(toml)))
    }

    #[test]
    fn test_defaults_fill_the_gaps() {
        let config = from_toml(r#"roots = ["/srv/media"]"#).unwrap();
        assert_eq!(config.roots, vec![PathBuf::from("/srv/media")]);
        assert_eq!(config.workers, 4);
        assert_eq!(config.animated_fps, 8.0);
        assert!(config.soft_delete);
        assert_eq!(config.trash_retention_days, 30);
        assert_eq!(config.ffprobe, None);
        assert_eq!(config.cache, CacheConfig::default());
    }

    #[test]
    fn test_nested_cache_section() {
        let config = from_toml(
            r#"
                roots = ["/srv/media", "/srv/archive"]
                workers = 8
                soft_delete = false

                [cache]
                trash = "/srv/media/.trash"
            "#,
        )
        .unwrap();
        assert_eq!(config.roots.len(), 2);
        assert_eq!(config.workers, 8);
        assert!(!config.soft_delete);
        assert_eq!(config.cache.trash, PathBuf::from("/srv/media/.trash"));
        // Unset siblings keep their defaults.
        assert_eq!(config.cache.staging, CacheConfig::default().staging);
        assert!(config.excluded_dirs().contains(&PathBuf::from("/srv/media/.trash")));
    }

    #[rstest]
    #[case("roots = []")]
    #[case(r#"roots = ["relative/path"]"#)]
    #[case("roots = [\"/srv\"]\nworkers = 0")]
    #[case("roots = [\"/srv\"]\nanimated_fps = 0.0")]
    #[case("roots = [\"/srv\"]\nanimated_fps = -8.0")]
    fn test_invalid(#[case] toml: &str) {
        let err = from_toml(toml).unwrap_err();
        assert!(matches!(&*err, ErrorKind::Invalid(_)), "{err:?}");
    }

    #[test]
    fn test_wrong_type_fails_to_load() {
        let err = from_toml("roots = [\"/srv\"]\nworkers = \"many\"").unwrap_err();
        assert!(matches!(&*err, ErrorKind::Load));
    }

    #[rstest]
    #[case("mediadex.yaml", "roots:\n  - /srv/yaml\n")]
    #[case("mediadex.json", r#"{"roots": ["/srv/yaml"]}"#)]
    #[case("mediadex.toml", r#"roots = ["/srv/yaml"]"#)]
    fn test_explicit_file(#[case] name: &str, #[case] contents: &str) {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join(name);
        std::fs::write(&path, contents).unwrap();
        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.roots, vec![PathBuf::from("/srv/yaml")]);
    }

    #[test]
    fn test_explicit_file_errors() {
        let temp = tempfile::tempdir().unwrap();
        let missing = temp.path().join("missing.toml");
        assert!(matches!(&*Config::figment(Some(&missing)).unwrap_err(), ErrorKind::NotFound(_)));

        let ini = temp.path().join("mediadex.ini");
        std::fs::write(&ini, "roots=/srv").unwrap();
        assert!(matches!(&*Config::figment(Some(&ini)).unwrap_err(), ErrorKind::UnsupportedFormat(_)));
    }
}
