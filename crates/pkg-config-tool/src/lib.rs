use std::collections::HashMap;
use std::ffi::OsStr;
use std::path::PathBuf;
use std::process::{Command, Output};
use tracing::{debug, warn};

/// Supplies the compiler flags a package needs, e.g. its include directories.
pub trait PackageFlagProvider {
    /// Flags for `package`. Providers never fail: a package they know nothing
    /// about yields an empty list.
    fn package_flags(&self, package: &str) -> Vec<String>;
}

/// Error types for pkg-config invocations
#[derive(Debug)]
pub enum PkgConfigError {
    ToolNotFound(String),
    ExecutionError(std::io::Error),
    ProcessFailed(i32, String),
    InvalidOutput(String),
}

impl From<std::io::Error> for PkgConfigError {
    fn from(error: std::io::Error) -> Self {
        PkgConfigError::ExecutionError(error)
    }
}

impl std::fmt::Display for PkgConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PkgConfigError::ToolNotFound(tool) => write!(f, "Tool not found on PATH: {}", tool),
            PkgConfigError::ExecutionError(err) => write!(f, "Execution error: {}", err),
            PkgConfigError::ProcessFailed(code, output) => {
                write!(f, "Process failed with exit code {}: {}", code, output)
            }
            PkgConfigError::InvalidOutput(msg) => write!(f, "Invalid output: {}", msg),
        }
    }
}

impl std::error::Error for PkgConfigError {}

/// Configuration for pkg-config invocations
#[derive(Debug, Clone)]
pub struct PkgConfigOptions {
    /// Name or path of the pkg-config executable
    pub tool: String,

    /// Extra arguments passed before `--cflags`
    pub extra_args: Vec<String>,
}

impl Default for PkgConfigOptions {
    fn default() -> Self {
        Self {
            tool: "pkg-config".to_string(),
            extra_args: Vec::new(),
        }
    }
}

#[derive(Clone)]
pub struct PkgConfig {
    options: PkgConfigOptions,
}

impl PkgConfig {
    pub fn new(options: PkgConfigOptions) -> Self {
        PkgConfig { options }
    }

    /// Locate the configured tool on PATH.
    pub fn locate(&self) -> Result<PathBuf, PkgConfigError> {
        which::which(&self.options.tool)
            .map_err(|_| PkgConfigError::ToolNotFound(self.options.tool.clone()))
    }

    /// Run `pkg-config --cflags <package>` and split its output into flags.
    pub fn cflags(&self, package: &str) -> Result<Vec<String>, PkgConfigError> {
        let output = self.run_tool(&["--cflags", package])?;
        let stdout = String::from_utf8(output.stdout)
            .map_err(|err| PkgConfigError::InvalidOutput(err.to_string()))?;

        Ok(split_flags(&stdout))
    }

    fn run_tool<S: AsRef<OsStr>>(&self, args: &[S]) -> Result<Output, PkgConfigError> {
        let tool = self.locate()?;
        let output = Command::new(tool)
            .args(&self.options.extra_args)
            .args(args)
            .output()?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(PkgConfigError::ProcessFailed(
                output.status.code().unwrap_or(-1),
                stderr,
            ));
        }

        Ok(output)
    }
}

impl PackageFlagProvider for PkgConfig {
    fn package_flags(&self, package: &str) -> Vec<String> {
        match self.cflags(package) {
            Ok(flags) => {
                debug!(package, ?flags, "pkg-config flags");
                flags
            }
            Err(err) => {
                warn!(package, tool = %self.options.tool, "no package flags: {}", err);
                Vec::new()
            }
        }
    }
}

/// Fixed package flags, for hosts that already know them and for tests.
#[derive(Debug, Clone, Default)]
pub struct StaticPackageFlags {
    packages: HashMap<String, Vec<String>>,
}

impl StaticPackageFlags {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_package<S: Into<String>>(&mut self, package: &str, flags: Vec<S>) -> &mut Self {
        self.packages.insert(
            package.to_string(),
            flags.into_iter().map(Into::into).collect(),
        );
        self
    }
}

impl PackageFlagProvider for StaticPackageFlags {
    fn package_flags(&self, package: &str) -> Vec<String> {
        self.packages.get(package).cloned().unwrap_or_default()
    }
}

/// Split tool output on whitespace, dropping empty tokens.
pub fn split_flags(output: &str) -> Vec<String> {
    output.split_whitespace().map(str::to_string).collect()
}

/// Collect the flags of every package in order.
pub fn collect_package_flags<P>(provider: &P, packages: &[String]) -> Vec<String>
where
    P: PackageFlagProvider + ?Sized,
{
    packages
        .iter()
        .flat_map(|package| provider.package_flags(package))
        .collect()
}
