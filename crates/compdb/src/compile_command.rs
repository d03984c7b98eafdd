use crate::database::normalize_path;
use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// One entry of a clang JSON compilation database
#[derive(Debug, Clone, Deserialize)]
pub struct CompileCommand {
    /// Working directory of the compilation
    pub directory: PathBuf,

    /// The main translation unit source
    pub file: PathBuf,

    /// The compile command argv, compiler first
    #[serde(default)]
    pub arguments: Option<Vec<String>>,

    /// The compile command as a single shell-escaped string
    #[serde(default)]
    pub command: Option<String>,

    /// The output created by this compilation step
    #[serde(default)]
    pub output: Option<PathBuf>,
}

/// Switches that only make sense for an actual compile and take a value.
static OUTPUT_FLAGS_WITH_VALUE: &[&str] = &["-o", "-MF", "-MQ", "-MT"];

/// Switches that only make sense for an actual compile.
static OUTPUT_FLAGS: &[&str] = &["-c", "-MD", "-MMD"];

/// Driver options that start with `-o` but are not a fused `-o<out>`.
static NON_OUTPUT_PREFIXES: &[&str] = &["-obj"];

impl CompileCommand {
    /// The full argv, preferring `arguments` over `command`.
    pub fn argv(&self) -> Result<Vec<String>> {
        if let Some(arguments) = &self.arguments {
            return Ok(arguments.clone());
        }

        let command = self.command.as_ref().ok_or_else(|| {
            anyhow!(
                "Entry for {} has neither arguments nor command",
                self.file.display()
            )
        })?;

        match shell_words::split(command) {
            Ok(args) => Ok(args),
            Err(e) => Err(anyhow!("Invalid command line syntax: {}", e)),
        }
    }

    /// The flags a parser needs for this file: the argv without the compiler,
    /// the output switches and the source file itself.
    pub fn compiler_flags(&self) -> Result<Vec<String>> {
        let args = self.argv()?;
        let source = normalize_path(&self.directory.join(&self.file));

        let mut flags = Vec::new();
        let mut i = 1;
        while i < args.len() {
            let arg = &args[i];

            let is_output = OUTPUT_FLAGS.contains(&arg.as_str()) || is_fused_output(arg);
            let is_source =
                !arg.starts_with('-') && normalize_path(&self.directory.join(arg)) == source;

            if OUTPUT_FLAGS_WITH_VALUE.contains(&arg.as_str()) {
                // Skip the argument too
                i += 1;
            } else if !is_output && !is_source {
                flags.push(arg.clone());
            }

            i += 1;
        }

        Ok(flags)
    }

    /// The source path this entry describes, absolute against `root`.
    pub fn source_path(&self, root: &Path) -> PathBuf {
        normalize_path(&self.working_dir(root).join(&self.file))
    }

    /// The compilation directory, absolute against `root`.
    pub fn working_dir(&self, root: &Path) -> PathBuf {
        normalize_path(&root.join(&self.directory))
    }
}

fn is_fused_output(arg: &str) -> bool {
    arg.starts_with("-o")
        && arg.len() > 2
        && !NON_OUTPUT_PREFIXES.iter().any(|prefix| arg.starts_with(prefix))
}
