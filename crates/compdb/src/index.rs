use std::path::{Path, PathBuf};

/// Compiler flags for one source file, with the directory they are relative to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileInfo {
    pub flags: Vec<String>,
    pub working_dir: PathBuf,
}

/// A lookup from source file to the flags it is compiled with.
///
/// Backends decide how `file` is matched; `None` means the index has nothing
/// for it and the caller falls back to its own defaults.
pub trait CompilationIndex {
    fn compile_info(&self, file: &Path) -> Option<CompileInfo>;
}
