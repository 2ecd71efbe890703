/// Delimiter separating a parameter key from its value.
pub const KEY_VALUE_DELIM: char = '=';

/// Whitespace characters that separate tokens in slash-command text.
///
/// Tabs are deliberately absent: the chat client never sends them, so only
/// this set counts as a token boundary.
pub fn is_boundary_whitespace(ch: char) -> bool {
    matches!(ch, ' ' | '\n' | '\r' | '\x0c')
}

pub(crate) fn trim_boundary(text: &str) -> &str {
    text.trim_matches(is_boundary_whitespace)
}

/// Locates the start of the next `key = value` pair in `text`.
///
/// Returns the byte index of the first character of the key, relative to
/// `text` with leading whitespace removed; callers that slice by the result
/// must trim the same way first. `None` means the fragment holds no further
/// pair: there is no delimiter, or the first delimiter begins or ends the
/// fragment (a trailing bare value).
///
/// The heuristic is the single place pair boundaries are decided. It finds
/// the first delimiter, walks back over the whitespace between the key and
/// the delimiter, then walks to the start of the key token, stopping at any
/// boundary whitespace.
pub fn find_next_key_start(text: &str) -> Option<usize> {
    let trimmed = text.trim_start_matches(is_boundary_whitespace);
    if trimmed.is_empty() {
        return None;
    }
    let delim = trimmed.find(KEY_VALUE_DELIM)?;
    if delim == 0 || delim + KEY_VALUE_DELIM.len_utf8() == trimmed.len() {
        return None;
    }
    let before = &trimmed[..delim];
    let key_end = before
        .char_indices()
        .rev()
        .find(|(_, ch)| !is_boundary_whitespace(*ch))
        .map(|(idx, _)| idx)?;
    let key_start = before[..key_end]
        .char_indices()
        .rev()
        .take_while(|(_, ch)| !is_boundary_whitespace(*ch))
        .last()
        .map(|(idx, _)| idx)
        .unwrap_or(key_end);
    Some(key_start)
}
