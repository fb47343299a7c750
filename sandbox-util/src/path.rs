//! Pure path utilities for the virtual file system.
//!
//! Virtual paths are always `/`-separated and absolute. They are
//! represented as plain [`String`]s rather than [`std::path::Path`],
//! since virtual paths never touch the host's path conventions.

/// Split a normalized absolute path into its segments.
///
/// `"/"` splits into no segments.
fn segments(path: &str) -> impl Iterator<Item = &str>
{
    path.split('/').filter(|s| !s.is_empty())
}

/// Normalize an absolute virtual path.
///
/// Resolves `.` and `..` segments, collapses repeated and trailing
/// slashes. A leading `..` past the root is simply discarded, matching
/// common shell behavior (`cd /..` stays at `/`).
///
/// # Panics
///
/// Panics if `path` does not start with `/`.
pub fn normalize(path: &str) -> String
{
    assert!(path.starts_with('/'), "virtual paths must be absolute: {path:?}");

    let mut stack: Vec<&str> = Vec::new();
    for segment in segments(path) {
        match segment {
            "." => {},
            ".." => { stack.pop(); },
            segment => stack.push(segment),
        }
    }

    if stack.is_empty() {
        "/".to_owned()
    } else {
        let mut out = String::with_capacity(path.len());
        for segment in stack {
            out.push('/');
            out.push_str(segment);
        }
        out
    }
}

/// Join a (possibly relative) path onto a base absolute path.
///
/// If `path` is already absolute, it is normalized on its own (the base
/// is ignored), matching how an absolute argument overrides `cwd`.
pub fn resolve(base: &str, path: &str) -> String
{
    if path.starts_with('/') {
        normalize(path)
    } else if path.is_empty() {
        normalize(base)
    } else {
        normalize(&format!("{}/{}", base.trim_end_matches('/'), path))
    }
}

/// Join two path components, normalizing the result.
///
/// Equivalent to [`resolve`] but reads better at call sites that are
/// unambiguously joining rather than resolving a possibly-relative input.
pub fn join(base: &str, child: &str) -> String
{
    resolve(base, child)
}

/// The parent directory of a normalized absolute path.
///
/// `dirname("/")` is `"/"`. `dirname("/a")` is `"/"`. `dirname("/a/b")` is
/// `"/a"`.
pub fn dirname(path: &str) -> String
{
    let path = normalize(path);
    match path.rfind('/') {
        Some(0) => "/".to_owned(),
        Some(i) => path[..i].to_owned(),
        None => "/".to_owned(),
    }
}

/// The final component of a normalized absolute path.
///
/// `basename("/")` is `""`. `basename("/a/b")` is `"b"`.
pub fn basename(path: &str) -> &str
{
    let path = path.trim_end_matches('/');
    match path.rfind('/') {
        Some(i) => &path[i + 1..],
        None => path,
    }
}

/// Whether `prefix` is a path-segment prefix of `path`.
///
/// Both must already be normalized. `"/a"` is a prefix of `"/a/b"` and of
/// `"/a"` but not of `"/ab"`.
pub fn is_prefix(prefix: &str, path: &str) -> bool
{
    if prefix == "/" {
        return true;
    }
    path == prefix || path.starts_with(&format!("{prefix}/"))
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn normalize_examples()
    {
        assert_eq!(normalize("/"), "/");
        assert_eq!(normalize("/a/b/"), "/a/b");
        assert_eq!(normalize("/a/./b"), "/a/b");
        assert_eq!(normalize("/a/../b"), "/b");
        assert_eq!(normalize("/a/b/.."), "/a");
        assert_eq!(normalize("/../a"), "/a");
        assert_eq!(normalize("//a///b"), "/a/b");
    }

    #[test]
    fn dirname_basename_examples()
    {
        assert_eq!(dirname("/"), "/");
        assert_eq!(dirname("/a"), "/");
        assert_eq!(dirname("/a/b"), "/a");
        assert_eq!(basename("/"), "");
        assert_eq!(basename("/a"), "a");
        assert_eq!(basename("/a/b"), "b");
    }

    #[test]
    fn resolve_relative_and_absolute()
    {
        assert_eq!(resolve("/a/b", "c"), "/a/b/c");
        assert_eq!(resolve("/a/b", "../c"), "/a/c");
        assert_eq!(resolve("/a/b", "/z"), "/z");
        assert_eq!(resolve("/a/b", ""), "/a/b");
    }

    #[test]
    fn is_prefix_examples()
    {
        assert!(is_prefix("/", "/a/b"));
        assert!(is_prefix("/a", "/a"));
        assert!(is_prefix("/a", "/a/b"));
        assert!(!is_prefix("/a", "/ab"));
    }

    proptest::proptest! {
        #[test]
        fn normalize_is_idempotent(segs in proptest::collection::vec("[a-z]{1,5}", 0..6)) {
            let path = format!("/{}", segs.join("/"));
            let once = normalize(&path);
            let twice = normalize(&once);
            proptest::prop_assert_eq!(once, twice);
        }

        #[test]
        fn normalize_ignores_trailing_slash_and_dot(segs in proptest::collection::vec("[a-z]{1,5}", 1..6)) {
            let path = format!("/{}", segs.join("/"));
            let with_trailing = format!("{path}/");
            let with_dot = format!("{path}/.");
            proptest::prop_assert_eq!(normalize(&path), normalize(&with_trailing));
            proptest::prop_assert_eq!(normalize(&path), normalize(&with_dot));
        }
    }
}
