use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Looked up in the current directory when no config file is given.
pub const DEFAULT_CONF_FILENAME: &str = ".flagconf.json";

/// Project configuration: the flags to use when no compilation database
/// knows a file, and where to find one.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ExtraConf {
    /// Flags used for every file the compilation database does not cover
    #[serde(rename = "baselineFlags")]
    pub baseline_flags: Vec<String>,

    /// Packages whose `pkg-config --cflags` are appended to the baseline
    #[serde(rename = "packageNames")]
    pub package_names: Vec<String>,

    /// Directory holding `compile_commands.json`, or the file itself
    #[serde(rename = "compilationDatabasePath")]
    pub compilation_database_path: Option<PathBuf>,

    /// Directory the baseline flags are relative to
    #[serde(rename = "projectDir")]
    pub project_dir: PathBuf,
}

impl Default for ExtraConf {
    fn default() -> Self {
        Self {
            baseline_flags: [
                "-Wall", "-Wextra", "-std=c++1z", "-x", "c++", "-I", "include", "-I", "inc",
                "-I", ".",
            ]
            .iter()
            .map(|flag| flag.to_string())
            .collect(),
            package_names: vec!["gtkmm-3.0".to_string()],
            compilation_database_path: None,
            project_dir: PathBuf::new(),
        }
    }
}

impl ExtraConf {
    /// Defaults rooted at `project_dir`.
    pub fn for_project<P: Into<PathBuf>>(project_dir: P) -> Self {
        Self {
            project_dir: project_dir.into(),
            ..Self::default()
        }
    }

    /// Read a JSON config file.
    ///
    /// Relative `projectDir` and `compilationDatabasePath` values are taken
    /// relative to the file's directory, which is also the default
    /// `projectDir`.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;

        let conf_dir = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => std::env::current_dir()?,
        };

        Self::from_json(&json, &conf_dir)
            .with_context(|| format!("Failed to parse config {}", path.display()))
    }

    pub fn from_json(json: &str, conf_dir: &Path) -> Result<Self> {
        let mut conf: ExtraConf = serde_json::from_str(json)?;
        conf.project_dir = if conf.project_dir.as_os_str().is_empty() {
            conf_dir.to_path_buf()
        } else {
            conf_dir.join(&conf.project_dir)
        };
        conf.compilation_database_path = conf
            .compilation_database_path
            .map(|compdb| conf_dir.join(compdb));
        Ok(conf)
    }
}
