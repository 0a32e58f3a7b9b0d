use crate::fs_reader::FilesystemTime;
use crate::naming::{NamingPattern, NamingSettings, DEFAULT_DATE_FORMAT};
use crate::resolver::{DeepOptions, ResolverOptions};
use crate::tool_reader::ExifToolMode;
use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ExifToolSetting {
    #[default]
    Auto,
    Off,
    Path,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AppConfig {
    pub date_format: String,
    pub prefix: String,
    pub suffix: String,
    pub pattern: NamingPattern,
    pub use_filesystem_fallback: bool,
    pub filesystem_time: FilesystemTime,
    pub recursive_default: bool,
    pub include_hidden_default: bool,
    pub exiftool: ExifToolSetting,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exiftool_path: Option<PathBuf>,
    pub parallel_scan: bool,
    pub deep: DeepOptions,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            date_format: DEFAULT_DATE_FORMAT.to_string(),
            prefix: String::new(),
            suffix: String::new(),
            pattern: NamingPattern::DateOnly,
            use_filesystem_fallback: false,
            filesystem_time: FilesystemTime::Created,
            recursive_default: false,
            include_hidden_default: false,
            exiftool: ExifToolSetting::Auto,
            exiftool_path: None,
            parallel_scan: true,
            deep: DeepOptions::default(),
        }
    }
}

impl AppConfig {
    pub fn naming_settings(&self) -> NamingSettings {
        NamingSettings {
            format_str: self.date_format.clone(),
            prefix: self.prefix.clone(),
            suffix: self.suffix.clone(),
            pattern: self.pattern,
            use_filesystem_fallback: self.use_filesystem_fallback,
        }
    }

    pub fn resolver_options(&self) -> ResolverOptions {
        let exiftool = match (self.exiftool, &self.exiftool_path) {
            (ExifToolSetting::Off, _) => ExifToolMode::Off,
            (ExifToolSetting::Path, Some(path)) => ExifToolMode::Path(path.clone()),
            // A path setting without a path behaves like auto.
            (ExifToolSetting::Path, None) | (ExifToolSetting::Auto, _) => ExifToolMode::Auto,
        };
        ResolverOptions {
            exiftool,
            deep: self.deep,
            filesystem_time: self.filesystem_time,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppPaths {
    pub config_dir: PathBuf,
    pub config_path: PathBuf,
    pub journal_path: PathBuf,
}

pub fn app_paths() -> Result<AppPaths> {
    let proj = ProjectDirs::from("org", "date-renamer", "date-renamer")
        .context("could not determine the OS config directory")?;
    let config_dir = proj.config_dir().to_path_buf();
    Ok(AppPaths {
        config_path: config_dir.join("config.toml"),
        journal_path: config_dir.join("operations.log"),
        config_dir,
    })
}

pub fn load_config() -> Result<AppConfig> {
    let paths = app_paths()?;
    load_config_from(&paths.config_path)
}

pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    if !path.exists() {
        return Ok(AppConfig::default());
    }

    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file: {}", path.display()))?;
    let config = toml::from_str::<AppConfig>(&raw)
        .with_context(|| format!("failed to parse config file: {}", path.display()))?;
    Ok(config)
}

pub fn save_config(config: &AppConfig) -> Result<()> {
    let paths = app_paths()?;
    save_config_to(&paths.config_path, config)
}

pub fn save_config_to(path: &Path, config: &AppConfig) -> Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)
            .with_context(|| format!("failed to create config directory: {}", dir.display()))?;
    }
    let body = toml::to_string_pretty(config).context("failed to serialize config")?;
    fs::write(path, body)
        .with_context(|| format!("failed to write config file: {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{load_config_from, save_config_to, AppConfig, ExifToolSetting};
    use crate::fs_reader::FilesystemTime;
    use crate::naming::NamingPattern;
    use crate::tool_reader::ExifToolMode;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn missing_file_yields_defaults() {
        let temp = tempdir().expect("tempdir");
        let config = load_config_from(&temp.path().join("config.toml")).expect("load");
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.naming_settings().format_str, "%Y-%m-%d_%H-%M-%S");
        assert!(config.deep.parse_filename);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("config.toml");
        fs::write(
            &path,
            "pattern = \"original_plus_date\"\nfilesystem_time = \"modified\"\n\n[deep]\nparse_filename = false\n",
        )
        .expect("write config");

        let config = load_config_from(&path).expect("load");
        assert_eq!(config.pattern, NamingPattern::OriginalPlusDate);
        assert_eq!(config.filesystem_time, FilesystemTime::Modified);
        assert!(!config.deep.parse_filename);
        assert!(config.deep.read_takeout_json);
        assert!(config.parallel_scan);
    }

    #[test]
    fn saved_config_loads_back() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("nested").join("config.toml");
        let config = AppConfig {
            prefix: "trip_".to_string(),
            exiftool: ExifToolSetting::Path,
            exiftool_path: Some("/opt/exiftool/exiftool".into()),
            ..AppConfig::default()
        };
        save_config_to(&path, &config).expect("save");

        let loaded = load_config_from(&path).expect("load");
        assert_eq!(loaded, config);
        assert_eq!(
            loaded.resolver_options().exiftool,
            ExifToolMode::Path("/opt/exiftool/exiftool".into())
        );
    }

    #[test]
    fn broken_toml_is_an_error() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("config.toml");
        fs::write(&path, "pattern = [").expect("write config");
        assert!(load_config_from(&path).is_err());
    }
}
