//! URL joining helpers

use url::Url;

/// Join `segments` onto the path of `base`.
///
/// Every component is separated by exactly one `/`. Runs of slashes in the
/// base path or inside a segment collapse to one, and empty pieces are
/// skipped. Query and fragment of the base are kept.
pub fn join_url<S: AsRef<str>>(base: &Url, segments: &[S]) -> Url {
    let mut path = String::new();

    let pieces = std::iter::once(base.path())
        .chain(segments.iter().map(|s| s.as_ref()))
        .flat_map(|part| part.split('/'))
        .filter(|piece| !piece.is_empty());
    for piece in pieces {
        path.push('/');
        path.push_str(piece);
    }

    if path.is_empty() {
        path.push('/');
    }

    let mut joined = base.clone();
    joined.set_path(&path);
    joined
}
