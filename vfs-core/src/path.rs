//! Pure path-string functions (§4.1, C1).
//!
//! A logical path is a `/`-separated string. An absolute path either starts
//! with `/` or matches `<letter>:/…` (drive-letter root). Comparisons
//! elsewhere in the crate always go through [`to_lower`].

pub const SEPARATOR: char = '/';

/// `to_lowercase` of the whole string — used as the key for every map in
/// this crate (handle table, root-path list, archive cache).
pub fn to_lower(path: &str) -> String {
    path.to_lowercase()
}

pub(crate) fn has_drive_letter_root(path: &str) -> bool {
    let b = path.as_bytes();
    b.len() >= 3 && b[0].is_ascii_alphabetic() && b[1] == b':' && b[2] == SEPARATOR as u8
}

/// `starts with the separator, OR length >= 3 with letter + ':' + separator`.
pub fn is_absolute(path: &str) -> bool {
    path.starts_with(SEPARATOR) || has_drive_letter_root(path)
}

/// The reference implementation's `IsRootDir("/")` reads past the end of a
/// length-1 string. The correct predicate, per §9: length 1 with `[0]` a
/// separator, or length 3 matching the drive-letter root pattern.
fn is_root_dir(path: &str) -> bool {
    (path.len() == 1 && path.starts_with(SEPARATOR)) || (path.len() == 3 && has_drive_letter_root(path))
}

/// If `force` is false and `path` is a root directory (`/` or `X:/`), return
/// it unchanged. Otherwise drop one trailing separator if present.
pub fn without_trailing_separator(path: &str, force: bool) -> &str {
    if !force && is_root_dir(path) {
        return path;
    }
    path.strip_suffix(SEPARATOR).unwrap_or(path)
}

/// Strip a trailing separator, then drop everything from the final
/// separator onward. `/` and `X:/` return empty; a path with no separator
/// (a bare component) has no parent, so it returns empty too.
pub fn get_path(path: &str) -> String {
    if is_root_dir(path) {
        return String::new();
    }
    let stripped = without_trailing_separator(path, true);
    match stripped.rfind(SEPARATOR) {
        Some(i) => stripped[..i].to_string(),
        None => String::new(),
    }
}

/// Strip a trailing separator, then take the tail after the final
/// separator. `/` and `X:/` return the input unchanged.
pub fn get_name(path: &str) -> &str {
    if is_root_dir(path) {
        return path;
    }
    let stripped = without_trailing_separator(path, true);
    match stripped.rfind(SEPARATOR) {
        Some(i) => &stripped[i + 1..],
        None => stripped,
    }
}

/// [`get_name`], then drop the suffix from the final `.` onward.
pub fn get_base_name(path: &str) -> &str {
    let name = get_name(path);
    match name.rfind('.') {
        Some(i) => &name[..i],
        None => name,
    }
}

/// [`get_name`], then the suffix after the final `.`, or empty if none.
pub fn get_extension(path: &str) -> &str {
    let name = get_name(path);
    match name.rfind('.') {
        Some(i) => &name[i + 1..],
        None => "",
    }
}

/// Join a root/parent and a relative tail with exactly one separator.
pub fn join(base: &str, tail: &str) -> String {
    let base = without_trailing_separator(base, false);
    if tail.is_empty() {
        base.to_string()
    } else {
        format!("{base}{SEPARATOR}{tail}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_paths_are_absolute() {
        assert!(is_absolute("/a/b"));
        assert!(is_absolute("C:/a/b"));
        assert!(!is_absolute("a/b"));
        assert!(!is_absolute("C:a/b"));
    }

    #[test]
    fn get_path_special_cases() {
        assert_eq!(get_path("/"), "");
        assert_eq!(get_path("C:/"), "");
        assert_eq!(get_path("foo.txt"), "");
    }

    #[test]
    fn get_name_special_cases() {
        assert_eq!(get_name("/"), "/");
        assert_eq!(get_name("C:/"), "C:/");
    }

    #[test]
    fn get_base_name_and_extension() {
        assert_eq!(get_base_name("a/b/button.png"), "button");
        assert_eq!(get_extension("a/b/button.png"), "png");
        assert_eq!(get_extension("a/b/noext"), "");
    }

    #[test]
    fn without_trailing_separator_idempotent() {
        for p in ["/", "C:/", "/a/b/", "/a/b"] {
            for force in [true, false] {
                let once = without_trailing_separator(p, force);
                let twice = without_trailing_separator(once, force);
                assert_eq!(once, twice);
            }
        }
    }

    #[test]
    fn path_plus_name_round_trips() {
        for p in ["/a/b/c", "a/b/c", "/r1/pack.DAGN/ui/button.png"] {
            let rejoined = format!("{}/{}", get_path(p), get_name(p));
            assert_eq!(rejoined, p);
        }
    }
}
