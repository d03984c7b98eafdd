use crate::conf::ExtraConf;
use crate::path_flags::make_relative_paths_absolute;
use compdb::{CompilationIndex, JsonCompilationDatabase};
use pkg_config_tool::{collect_package_flags, PackageFlagProvider, PkgConfig, PkgConfigOptions};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// The answer for one file: its final compiler flags and whether the host
/// may reuse them without asking again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileFlags {
    pub flags: Vec<String>,
    pub do_cache: bool,
}

/// FlagSource answers per-file flag queries for one project.
///
/// Package flags are collected once at construction; each query afterwards
/// is a database lookup plus path rewriting.
pub struct FlagSource {
    project_dir: PathBuf,
    flags: Vec<String>,
    index: Option<Box<dyn CompilationIndex>>,
}

impl FlagSource {
    pub fn new<P>(conf: &ExtraConf, packages: &P, index: Option<Box<dyn CompilationIndex>>) -> Self
    where
        P: PackageFlagProvider + ?Sized,
    {
        let mut flags = conf.baseline_flags.clone();
        flags.extend(collect_package_flags(packages, &conf.package_names));

        FlagSource {
            project_dir: conf.project_dir.clone(),
            flags,
            index,
        }
    }

    /// Wire up `pkg-config` and, if configured, the JSON compilation database.
    /// A database that fails to load is skipped with a warning.
    pub fn from_conf(conf: &ExtraConf, options: PkgConfigOptions) -> Self {
        let index = conf
            .compilation_database_path
            .as_ref()
            .and_then(|path| match JsonCompilationDatabase::load(path) {
                Ok(db) => {
                    debug!(root = %db.root().display(), entries = db.len(), "loaded compilation database");
                    Some(Box::new(db) as Box<dyn CompilationIndex>)
                }
                Err(err) => {
                    warn!("ignoring compilation database: {:#}", err);
                    None
                }
            });

        Self::new(conf, &PkgConfig::new(options), index)
    }

    /// Baseline and package flags, before path rewriting.
    pub fn default_flags(&self) -> &[String] {
        &self.flags
    }

    pub fn flags_for_file<P: AsRef<Path>>(&self, file: P) -> FileFlags {
        let file = file.as_ref();

        let info = self.index.as_ref().and_then(|index| index.compile_info(file));
        let flags = match info {
            Some(info) => {
                debug!(file = %file.display(), dir = %info.working_dir.display(), "compilation database hit");
                make_relative_paths_absolute(&info.flags, &info.working_dir)
            }
            None => make_relative_paths_absolute(&self.flags, &self.project_dir),
        };

        FileFlags {
            flags,
            do_cache: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pkg_config_tool::StaticPackageFlags;

    const DATABASE: &str = r#"[{
        "directory": "/proj/build",
        "file": "../src/chess.cpp",
        "arguments": ["g++", "-I../include", "-isystem", "gen", "-std=c++17", "-c", "../src/chess.cpp"]
    }]"#;

    fn strings(flags: &[&str]) -> Vec<String> {
        flags.iter().map(|f| f.to_string()).collect()
    }

    fn conf() -> ExtraConf {
        ExtraConf {
            baseline_flags: strings(&["-Wall", "-x", "c++", "-I", "include", "-I."]),
            package_names: strings(&["gtkmm-3.0"]),
            compilation_database_path: None,
            project_dir: PathBuf::from("/proj"),
        }
    }

    fn packages() -> StaticPackageFlags {
        let mut packages = StaticPackageFlags::new();
        packages.add_package("gtkmm-3.0", vec!["-I/usr/include/gtkmm-3.0", "-pthread"]);
        packages
    }

    fn index() -> Option<Box<dyn CompilationIndex>> {
        let db = JsonCompilationDatabase::from_json(DATABASE, Path::new("/proj")).unwrap();
        Some(Box::new(db))
    }

    #[test]
    fn test_baseline_and_package_flags() {
        let source = FlagSource::new(&conf(), &packages(), None);
        assert_eq!(
            source.default_flags(),
            strings(&["-Wall", "-x", "c++", "-I", "include", "-I.", "-I/usr/include/gtkmm-3.0", "-pthread"])
        );

        assert_eq!(
            source.flags_for_file("/proj/src/chess.cpp"),
            FileFlags {
                flags: strings(&[
                    "-Wall",
                    "-x",
                    "c++",
                    "-I",
                    "/proj/include",
                    "-I/proj/.",
                    "-I/usr/include/gtkmm-3.0",
                    "-pthread"
                ]),
                do_cache: true,
            }
        );
    }

    #[test]
    fn test_database_hit() {
        let source = FlagSource::new(&conf(), &packages(), index());
        let file_flags = source.flags_for_file("/proj/src/chess.cpp");
        assert_eq!(
            file_flags.flags,
            strings(&["-I/proj/build/../include", "-isystem", "/proj/build/gen", "-std=c++17"])
        );
        assert!(file_flags.do_cache);
    }

    #[test]
    fn test_database_miss_uses_baseline() {
        let source = FlagSource::new(&conf(), &packages(), index());
        let file_flags = source.flags_for_file("/proj/src/game.cpp");
        assert_eq!(file_flags.flags[3..5], ["-I", "/proj/include"]);
        assert!(file_flags.do_cache);
    }

    #[test]
    fn test_empty_project_dir_keeps_relative_flags() {
        let conf = ExtraConf {
            project_dir: PathBuf::new(),
            package_names: Vec::new(),
            ..conf()
        };
        let source = FlagSource::new(&conf, &packages(), None);
        assert_eq!(source.flags_for_file("main.cpp").flags, conf.baseline_flags);
    }

    #[test]
    fn test_from_conf_degrades() {
        let conf = ExtraConf {
            compilation_database_path: Some(PathBuf::from("/nonexistent/flagconf/build")),
            ..conf()
        };
        let options = PkgConfigOptions {
            tool: "flagconf-test-no-such-tool".to_string(),
            extra_args: Vec::new(),
        };
        let source = FlagSource::from_conf(&conf, options);
        assert_eq!(source.default_flags(), conf.baseline_flags.as_slice());
        assert_eq!(
            source.flags_for_file("/proj/src/chess.cpp").flags[3..5],
            ["-I", "/proj/include"]
        );
    }

    #[test]
    fn test_serializes_for_host() {
        let file_flags = FileFlags {
            flags: strings(&["-Wall"]),
            do_cache: true,
        };
        assert_eq!(
            serde_json::to_string(&file_flags).unwrap(),
            r#"{"flags":["-Wall"],"do_cache":true}"#
        );
    }
}
