use crate::conf::{ExtraConf, DEFAULT_CONF_FILENAME};
use crate::flags::{FileFlags, FlagSource};
use anyhow::Result;
use clap::Parser;
use compdb::database::DATABASE_FILENAME;
use pkg_config_tool::PkgConfigOptions;
use std::{
    env,
    io::{self, Write},
    path::{Path, PathBuf},
};
use tracing::debug;
use walkdir::WalkDir;

/// How deep `--find-compdb` looks below the project directory.
const COMPDB_SEARCH_DEPTH: usize = 3;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "flagconf: Compiler flags for editor completion engines"
)]
pub struct Cli {
    /// Change to DIR before doing anything else
    #[arg(short = 'C')]
    pub dir: Option<PathBuf>,

    /// JSON config file [default=.flagconf.json if present]
    #[arg(long, env = "FLAGCONF_CONFIG")]
    pub config: Option<PathBuf>,

    /// Directory containing compile_commands.json, or the file itself
    #[arg(long, env = "FLAGCONF_COMPDB")]
    pub compdb: Option<PathBuf>,

    /// Search the project directory for compile_commands.json when none is configured
    #[arg(long, default_value = "false")]
    pub find_compdb: bool,

    /// Add a pkg-config package whose cflags are appended
    #[arg(long = "package")]
    pub packages: Vec<String>,

    /// Drop the configured packages
    #[arg(long, default_value = "false")]
    pub no_packages: bool,

    /// Specify the pkg-config tool
    #[arg(long = "pkg-config", default_value = "pkg-config", env = "PKG_CONFIG")]
    pub pkg_config: String,

    /// Output format
    #[arg(long, default_value = "json")]
    pub format: Format,

    /// Source files to produce flags for
    #[arg(required = true)]
    pub files: Vec<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, clap::ValueEnum)]
pub enum Format {
    /// One JSON object per file: {"flags": [...], "do_cache": true}
    Json,
    /// Flags shell-quoted on a single line
    Shell,
    /// One flag per line
    Lines,
}

pub fn run() -> Result<i32> {
    let cli = Cli::parse();

    if let Some(dir) = &cli.dir {
        env::set_current_dir(dir)?;
    }

    let current_dir = env::current_dir()?;
    let conf = load_conf(&cli, &current_dir)?;
    debug!(?conf, "configuration");

    let source = FlagSource::from_conf(
        &conf,
        PkgConfigOptions {
            tool: cli.pkg_config.clone(),
            extra_args: Vec::new(),
        },
    );

    let stdout = io::stdout();
    let mut out = stdout.lock();
    for file in &cli.files {
        let file_flags = source.flags_for_file(current_dir.join(file));
        writeln!(out, "{}", render(&file_flags, &cli.format)?)?;
    }

    Ok(0)
}

/// Build the configuration from the config file and command line overrides.
fn load_conf(cli: &Cli, current_dir: &Path) -> Result<ExtraConf> {
    let default_conf = current_dir.join(DEFAULT_CONF_FILENAME);
    let mut conf = match &cli.config {
        Some(path) => ExtraConf::load(current_dir.join(path))?,
        None if default_conf.is_file() => ExtraConf::load(&default_conf)?,
        None => ExtraConf::for_project(current_dir),
    };

    if let Some(compdb) = &cli.compdb {
        conf.compilation_database_path = Some(current_dir.join(compdb));
    }

    if cli.no_packages {
        conf.package_names.clear();
    }
    conf.package_names.extend(cli.packages.iter().cloned());

    if cli.find_compdb && conf.compilation_database_path.is_none() {
        conf.compilation_database_path = find_compdb(&conf.project_dir);
    }

    Ok(conf)
}

/// Find the shallowest compile_commands.json below `project_dir`.
fn find_compdb(project_dir: &Path) -> Option<PathBuf> {
    WalkDir::new(project_dir)
        .max_depth(COMPDB_SEARCH_DEPTH)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file() && entry.file_name() == DATABASE_FILENAME)
        .min_by_key(|entry| entry.depth())
        .map(|entry| entry.into_path())
}

fn render(file_flags: &FileFlags, format: &Format) -> Result<String> {
    let rendered = match format {
        Format::Json => serde_json::to_string(file_flags)?,
        Format::Shell => shell_words::join(&file_flags.flags),
        Format::Lines => file_flags.flags.join("\n"),
    };
    Ok(rendered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("flagconf").chain(args.iter().copied())).unwrap()
    }

    /// Command line as parsed with no flags, independent of the environment.
    fn cli() -> Cli {
        Cli {
            dir: None,
            config: None,
            compdb: None,
            find_compdb: false,
            packages: Vec::new(),
            no_packages: false,
            pkg_config: "pkg-config".to_string(),
            format: Format::Json,
            files: vec![PathBuf::from("main.cpp")],
        }
    }

    fn file_flags(flags: &[&str]) -> FileFlags {
        FileFlags {
            flags: flags.iter().map(|f| f.to_string()).collect(),
            do_cache: true,
        }
    }

    #[test]
    fn test_parse_args() {
        let cli = parse(&[
            "--package",
            "glib-2.0",
            "--package",
            "sdl2",
            "--format",
            "shell",
            "src/chess.cpp",
            "src/game.cpp",
        ]);
        assert_eq!(cli.packages, vec!["glib-2.0", "sdl2"]);
        assert_eq!(cli.format, Format::Shell);
        assert_eq!(cli.files.len(), 2);
        assert!(!cli.find_compdb);

        let cli = parse(&["--no-packages", "--find-compdb", "--compdb", "out", "main.cpp"]);
        assert!(cli.no_packages);
        assert!(cli.find_compdb);
        assert_eq!(cli.compdb, Some(PathBuf::from("out")));

        assert!(Cli::try_parse_from(["flagconf"]).is_err());
    }

    #[test]
    fn test_render() {
        let flags = file_flags(&["-I", "/proj/dir with spaces", "-Wall"]);
        assert_eq!(
            render(&flags, &Format::Json).unwrap(),
            r#"{"flags":["-I","/proj/dir with spaces","-Wall"],"do_cache":true}"#
        );
        assert_eq!(
            render(&flags, &Format::Shell).unwrap(),
            "-I '/proj/dir with spaces' -Wall"
        );
        assert_eq!(
            render(&flags, &Format::Lines).unwrap(),
            "-I\n/proj/dir with spaces\n-Wall"
        );
    }

    #[test]
    fn test_load_conf_overrides() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(DEFAULT_CONF_FILENAME),
            r#"{"packageNames": ["gtkmm-3.0"], "compilationDatabasePath": "build"}"#,
        )
        .unwrap();

        let conf = load_conf(&cli(), dir.path()).unwrap();
        assert_eq!(conf.package_names, vec!["gtkmm-3.0"]);
        assert_eq!(conf.compilation_database_path, Some(dir.path().join("build")));

        let overrides = Cli {
            no_packages: true,
            packages: vec!["sdl2".to_string()],
            compdb: Some(PathBuf::from("out")),
            ..cli()
        };
        let conf = load_conf(&overrides, dir.path()).unwrap();
        assert_eq!(conf.package_names, vec!["sdl2"]);
        assert_eq!(conf.compilation_database_path, Some(dir.path().join("out")));
    }

    #[test]
    fn test_load_conf_without_file() {
        let dir = tempfile::tempdir().unwrap();
        let conf = load_conf(&cli(), dir.path()).unwrap();
        assert_eq!(conf.project_dir, dir.path());
        assert_eq!(conf.baseline_flags, ExtraConf::default().baseline_flags);
    }

    #[test]
    fn test_find_compdb() {
        let dir = tempfile::tempdir().unwrap();
        assert!(find_compdb(dir.path()).is_none());

        fs::create_dir_all(dir.path().join("a/b")).unwrap();
        fs::create_dir_all(dir.path().join("build")).unwrap();
        fs::write(dir.path().join("a/b").join(DATABASE_FILENAME), "[]").unwrap();
        fs::write(dir.path().join("build").join(DATABASE_FILENAME), "[]").unwrap();

        assert_eq!(
            find_compdb(dir.path()),
            Some(dir.path().join("build").join(DATABASE_FILENAME))
        );

        let find = Cli {
            find_compdb: true,
            ..cli()
        };
        let conf = load_conf(&find, dir.path()).unwrap();
        assert_eq!(
            conf.compilation_database_path,
            Some(dir.path().join("build").join(DATABASE_FILENAME))
        );
    }
}
