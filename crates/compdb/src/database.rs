use crate::compile_command::CompileCommand;
use crate::index::{CompilationIndex, CompileInfo};
use anyhow::{Context, Result};
use std::collections::HashMap;
use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

pub const DATABASE_FILENAME: &str = "compile_commands.json";

static HEADER_EXTENSIONS: &[&str] = &["h", "hh", "hpp", "hxx", "h++", "inl"];

/// Tried in order when a header borrows the flags of its source file.
static SOURCE_EXTENSIONS: &[&str] = &["cpp", "cxx", "cc", "c", "c++", "m", "mm"];

/// A `compile_commands.json` loaded into memory, keyed by absolute source path.
#[derive(Debug, Clone)]
pub struct JsonCompilationDatabase {
    root: PathBuf,
    entries: HashMap<PathBuf, CompileInfo>,
}

impl JsonCompilationDatabase {
    /// Load the database from a directory containing `compile_commands.json`,
    /// or from the JSON file itself.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = absolute(path.as_ref())?;
        let (root, file) = if path.is_file() {
            let root = path.parent().map(Path::to_path_buf).unwrap_or_default();
            (root, path)
        } else {
            (path.clone(), path.join(DATABASE_FILENAME))
        };

        let json = fs::read_to_string(&file)
            .with_context(|| format!("Failed to read compilation database {}", file.display()))?;

        Self::from_json(&json, &root)
            .with_context(|| format!("Failed to parse compilation database {}", file.display()))
    }

    /// Parse a database; relative entry directories are taken relative to `root`.
    pub fn from_json(json: &str, root: &Path) -> Result<Self> {
        let commands: Vec<CompileCommand> = serde_json::from_str(json)?;

        let mut entries = HashMap::new();
        for command in commands {
            let source = command.source_path(root);
            if entries.contains_key(&source) {
                continue;
            }

            let info = CompileInfo {
                flags: command.compiler_flags()?,
                working_dir: command.working_dir(root),
            };
            entries.insert(source, info);
        }

        Ok(JsonCompilationDatabase {
            root: root.to_path_buf(),
            entries,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn lookup(&self, file: &Path) -> Option<&CompileInfo> {
        let key = normalize_path(&self.root.join(file));
        if let Some(info) = self.entries.get(&key) {
            return Some(info);
        }

        if !is_header(&key) {
            return None;
        }

        SOURCE_EXTENSIONS.iter().find_map(|ext| {
            let source = key.with_extension(ext);
            let info = self.entries.get(&source)?;
            debug!(
                header = %key.display(),
                source = %source.display(),
                "using flags of sibling source"
            );
            Some(info)
        })
    }
}

impl CompilationIndex for JsonCompilationDatabase {
    fn compile_info(&self, file: &Path) -> Option<CompileInfo> {
        self.lookup(file).cloned()
    }
}

fn is_header(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| HEADER_EXTENSIONS.contains(&ext))
        .unwrap_or(false)
}

fn absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(normalize_path(path));
    }
    let current_dir = std::env::current_dir()?;
    Ok(normalize_path(&current_dir.join(path)))
}

/// Fold `.` and `..` components without touching the filesystem.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if normalized.file_name().is_some() {
                    normalized.pop();
                } else if !normalized.has_root() {
                    normalized.push("..");
                }
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}
