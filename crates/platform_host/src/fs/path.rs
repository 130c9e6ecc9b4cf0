//! Virtual-path helpers shared by the VFS store and durable storage adapters.

/// Root path of the virtual filesystem.
pub const ROOT_PATH: &str = "/";

/// Normalizes a virtual filesystem path into its canonical form.
///
/// This helper trims whitespace, converts backslashes to `/`, resolves `.`/`..`, ensures a
/// leading slash, drops trailing slashes, and returns `/` for empty or fully-collapsed paths.
pub fn normalize_virtual_path(path: &str) -> String {
    let trimmed = path.trim();
    if trimmed.is_empty() {
        return ROOT_PATH.to_string();
    }

    let mut out = String::new();
    for segment in trimmed.replace('\\', "/").split('/') {
        if segment.is_empty() || segment == "." {
            continue;
        }
        if segment == ".." {
            if let Some(idx) = out.rfind('/') {
                out.truncate(idx);
            }
            continue;
        }
        out.push('/');
        out.push_str(segment);
    }

    if out.is_empty() {
        ROOT_PATH.to_string()
    } else {
        out
    }
}

/// Returns the canonical parent of `path`, or `None` for the root.
///
/// `path` is expected to be canonical (see [`normalize_virtual_path`]).
pub fn parent_path(path: &str) -> Option<String> {
    if path == ROOT_PATH {
        return None;
    }
    match path.rfind('/') {
        Some(0) => Some(ROOT_PATH.to_string()),
        Some(idx) => Some(path[..idx].to_string()),
        None => Some(ROOT_PATH.to_string()),
    }
}

/// Returns the final segment of a canonical path (`""` for the root).
pub fn leaf_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or_default()
}

/// Returns `true` when `candidate` sits exactly one segment below `parent`.
pub fn is_direct_child(parent: &str, candidate: &str) -> bool {
    match relative_to(parent, candidate) {
        Some(rest) => !rest.is_empty() && !rest.contains('/'),
        None => false,
    }
}

/// Returns `true` when `candidate` sits anywhere below `ancestor` (excluding `ancestor` itself).
pub fn is_descendant(ancestor: &str, candidate: &str) -> bool {
    relative_to(ancestor, candidate).is_some_and(|rest| !rest.is_empty())
}

/// Returns the extension of a file name as written, without the dot.
///
/// Dotfiles such as `.profile` have no extension.
pub fn file_extension(name: &str) -> Option<&str> {
    let (stem, ext) = name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        None
    } else {
        Some(ext)
    }
}

fn relative_to<'a>(base: &str, candidate: &'a str) -> Option<&'a str> {
    let prefix = if base == ROOT_PATH { "" } else { base };
    candidate.strip_prefix(prefix)?.strip_prefix('/')
}
