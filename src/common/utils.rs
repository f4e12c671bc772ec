//! Utility functions for agency key paths

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};

/// Percent-encoding set for a single path segment in a URL
const SEGMENT_ENCODE_SET: &AsciiSet = &CONTROLS
    .add(b'/')
    .add(b'%')
    .add(b' ')
    .add(b'?')
    .add(b'#')
    .add(b'&')
    .add(b'+');

/// Encode a slash-delimited agency path for URL usage, segment by segment.
pub fn encode_path(path: &str) -> String {
    path.split('/')
        .filter(|s| !s.is_empty())
        .map(|s| utf8_percent_encode(s, SEGMENT_ENCODE_SET).to_string())
        .collect::<Vec<_>>()
        .join("/")
}

/// Join path segments with `/`, ignoring stray separators at the edges.
pub fn join_path(parts: &[&str]) -> String {
    parts
        .iter()
        .map(|p| p.trim_matches('/'))
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

/// Name of the direct child of `prefix` that `key` denotes.
///
/// Returns `None` when `key` is outside `prefix`, is `prefix` itself, or is
/// nested more than one level below it.
pub fn child_name<'a>(prefix: &str, key: &'a str) -> Option<&'a str> {
    let key = key.trim_start_matches('/');
    let prefix = prefix.trim_matches('/');
    let rest = key.strip_prefix(prefix)?.strip_prefix('/')?;
    let rest = rest.trim_end_matches('/');
    if rest.is_empty() || rest.contains('/') {
        None
    } else {
        Some(rest)
    }
}

/// Last segment of a slash-delimited path.
pub fn last_segment(path: &str) -> &str {
    path.trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or_default()
}

/// Reject names that cannot live as a single key segment.
pub fn validate_name(name: &str) -> crate::Result<()> {
    if name.is_empty() || name.contains('/') || name.trim() != name {
        return Err(crate::Error::InvalidName(name.to_string()));
    }
    Ok(())
}
