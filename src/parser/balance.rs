//! Brace and parenthesis balancing over adapted text.
//!
//! Comments and string literals are already escrowed when these helpers run,
//! so matching is plain depth counting after a regex prefix match — no
//! recursive patterns needed.

/// True for bytes that can occur in a C identifier.
pub fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// Index one past the delimiter closing `bytes[open]`. `bytes[open]` must be
/// the opening delimiter. Returns None when the text ends unbalanced.
pub fn close_of(bytes: &[u8], open: usize, open_ch: u8, close_ch: u8) -> Option<usize> {
    debug_assert_eq!(bytes[open], open_ch);
    let mut depth = 0usize;
    let mut i = open;
    while i < bytes.len() {
        let b = bytes[i];
        if b == open_ch {
            depth += 1;
        } else if b == close_ch {
            depth -= 1;
            if depth == 0 {
                return Some(i + 1);
            }
        }
        i += 1;
    }
    None
}

/// First index at or after `i` that is not ASCII whitespace.
pub fn skip_ws(bytes: &[u8], mut i: usize) -> usize {
    while i < bytes.len() && bytes[i].is_ascii_whitespace() {
        i += 1;
    }
    i
}

/// Skip whitespace and `<sentinel><digits><sentinel>` placeholders (used to
/// step over escrowed attribute junk between an argument list and a body).
pub fn skip_ws_and_placeholders(bytes: &[u8], mut i: usize, sentinel: u8) -> usize {
    loop {
        i = skip_ws(bytes, i);
        if i < bytes.len() && bytes[i] == sentinel {
            let mut j = i + 1;
            while j < bytes.len() && bytes[j].is_ascii_digit() {
                j += 1;
            }
            if j > i + 1 && j < bytes.len() && bytes[j] == sentinel {
                i = j + 1;
                continue;
            }
        }
        return i;
    }
}

/// The identifier starting exactly at `i`, if any.
pub fn ident_at(text: &str, i: usize) -> Option<&str> {
    let bytes = text.as_bytes();
    if i >= bytes.len() {
        return None;
    }
    let first = bytes[i];
    if !first.is_ascii_alphabetic() && first != b'_' {
        return None;
    }
    let mut j = i + 1;
    while j < bytes.len() && is_ident_byte(bytes[j]) {
        j += 1;
    }
    Some(&text[i..j])
}

/// The identifier ending immediately before `end` (exclusive), after
/// skipping whitespace backwards. Returns the identifier and its start.
pub fn ident_ending_before(text: &str, end: usize) -> Option<(usize, &str)> {
    let bytes = text.as_bytes();
    let mut i = end;
    while i > 0 && bytes[i - 1].is_ascii_whitespace() {
        i -= 1;
    }
    if i == 0 || !is_ident_byte(bytes[i - 1]) {
        return None;
    }
    let stop = i;
    while i > 0 && is_ident_byte(bytes[i - 1]) {
        i -= 1;
    }
    // Identifiers cannot start with a digit
    if bytes[i].is_ascii_digit() {
        return None;
    }
    Some((i, &text[i..stop]))
}

/// The last identifier token in `text`, ignoring trailing `[...]` groups
/// (array declarators) and whitespace.
pub fn last_ident(text: &str) -> Option<&str> {
    let bytes = text.as_bytes();
    let mut end = bytes.len();
    loop {
        while end > 0 && bytes[end - 1].is_ascii_whitespace() {
            end -= 1;
        }
        if end > 0 && bytes[end - 1] == b']' {
            // Step backwards over the bracket group
            let mut depth = 0usize;
            while end > 0 {
                end -= 1;
                if bytes[end] == b']' {
                    depth += 1;
                } else if bytes[end] == b'[' {
                    depth -= 1;
                    if depth == 0 {
                        break;
                    }
                }
            }
            continue;
        }
        break;
    }
    ident_ending_before(text, end).map(|(_, s)| s)
}
