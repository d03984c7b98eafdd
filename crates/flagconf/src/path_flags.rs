use std::path::Path;

/// Flags whose path may follow as the next argument.
static SEPARATE_PATH_FLAGS: &[&str] = &["-isystem", "-I", "-iquote"];

/// Flags whose path may be fused onto the flag itself.
static PATH_FLAGS: &[&str] = &["-isystem", "-I", "-iquote", "--sysroot="];

/// Rewrite the relative path of every path flag to be absolute under
/// `working_dir`.
///
/// Handles both the separate form (`-I include`) and the fused form
/// (`-Iinclude`, `--sysroot=sdk`). Absolute paths are left alone and nothing
/// touches the filesystem. Order is preserved; empty tokens are dropped. An
/// empty `working_dir` returns the flags unchanged.
pub fn make_relative_paths_absolute<S: AsRef<str>>(flags: &[S], working_dir: &Path) -> Vec<String> {
    if working_dir.as_os_str().is_empty() {
        return flags.iter().map(|flag| flag.as_ref().to_string()).collect();
    }

    let mut new_flags = Vec::with_capacity(flags.len());
    let mut make_next_absolute = false;

    for flag in flags {
        let flag: &str = flag.as_ref();
        let new_flag = if make_next_absolute {
            make_next_absolute = false;
            // An empty value stays empty and is dropped below.
            if flag.is_empty() || is_absolute(flag) {
                flag.to_string()
            } else {
                join(working_dir, flag)
            }
        } else if SEPARATE_PATH_FLAGS.contains(&flag) {
            make_next_absolute = true;
            flag.to_string()
        } else if let Some(path_flag) = PATH_FLAGS.iter().find(|p| flag.starts_with(*p)) {
            let path = &flag[path_flag.len()..];
            if is_absolute(path) {
                flag.to_string()
            } else {
                format!("{}{}", path_flag, join(working_dir, path))
            }
        } else {
            flag.to_string()
        };

        if !new_flag.is_empty() {
            new_flags.push(new_flag);
        }
    }

    new_flags
}

fn is_absolute(path: &str) -> bool {
    Path::new(path).has_root()
}

fn join(working_dir: &Path, path: &str) -> String {
    working_dir.join(path).to_string_lossy().into_owned()
}
