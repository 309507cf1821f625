//! Character-safe string shortening for log previews.
//!
//! Limits are counted in characters, not bytes, so previews of non-ASCII
//! copy never split a code point and line up with what a reader sees.

/// Longest prefix of `s` holding at most `max_chars` characters.
#[inline]
pub fn take_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((end, _)) => &s[..end],
        None => s,
    }
}

/// Shorten `s` to at most `max_chars` characters, ending in `"..."` when cut.
///
/// The suffix counts toward the limit, so the result never exceeds
/// `max_chars` characters.
pub fn preview(s: &str, max_chars: usize) -> String {
    const SUFFIX: &str = "...";
    if s.chars().count() <= max_chars {
        return s.to_owned();
    }
    let body = take_chars(s, max_chars.saturating_sub(SUFFIX.len()));
    let mut out = String::with_capacity(body.len() + SUFFIX.len());
    out.push_str(body);
    out.push_str(take_chars(SUFFIX, max_chars));
    out
}
