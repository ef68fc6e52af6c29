/// Joins path pieces, dropping empty and duplicate slashes. No pieces yield `""`.
pub fn join_path<I, S>(pieces: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut joined = String::new();
    for piece in pieces {
        for segment in piece.as_ref().split('/').filter(|s| !s.is_empty()) {
            joined.push('/');
            joined.push_str(segment);
        }
    }
    joined
}

/// Like [`join_path`] but the root is `/`, as the router expects.
pub fn route_path<I, S>(pieces: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let joined = join_path(pieces);
    if joined.is_empty() { "/".to_string() } else { joined }
}

/// Path of `full` relative to `prefix`, both normalized.
pub(crate) fn strip_prefix(full: &str, prefix: &str) -> String {
    let rest = if prefix.is_empty() {
        full
    } else {
        match full.strip_prefix(prefix) {
            Some(rest) if rest.is_empty() || rest.starts_with('/') => rest,
            _ => full,
        }
    };
    route_path([rest])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_without_duplicate_slashes() {
        assert_eq!(join_path(["/book/", "", "/{name}"]), "/book/{name}");
        assert_eq!(join_path(["//a//b/", "c/"]), "/a/b/c");
        assert_eq!(join_path(["", "/"]), "");
        assert_eq!(route_path(["", "/"]), "/");
    }

    #[test]
    fn strips_segment_prefixes_only() {
        assert_eq!(strip_prefix("/book/{name}", "/book"), "/{name}");
        assert_eq!(strip_prefix("/book", "/book"), "/");
        assert_eq!(strip_prefix("/books", "/book"), "/books");
        assert_eq!(strip_prefix("/a", ""), "/a");
    }
}
