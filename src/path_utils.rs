/// A single path segment is hidden when it starts with a period.
pub fn is_hidden_name(name: &str) -> bool {
    name.starts_with('.')
}

/// Reports whether any `/`-separated segment of `path` is hidden.
///
/// Empty segments produced by leading, trailing or repeated slashes never
/// match, so `""` and `"/"` are visible. No normalization happens here.
pub fn is_hidden(path: &str) -> bool {
    path.split('/').any(is_hidden_name)
}

/// Normalizes a logical path to `/`-rooted form: empty and `.` segments are
/// dropped, `..` removes the previous segment but never climbs above the
/// root. A trailing slash is kept.
pub fn clean(path: &str) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for seg in path.split('/') {
        match seg {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            seg => parts.push(seg),
        }
    }
    let mut out = format!("/{}", parts.join("/"));
    if path.ends_with('/') && !parts.is_empty() {
        out.push('/');
    }
    out
}
