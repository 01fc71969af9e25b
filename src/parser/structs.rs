//! Struct and union extraction.
//!
//! Matches `struct|union NAME { ... }` with brace balancing. Anonymous
//! bodies are skipped — they introduce no referencable identifier and their
//! text reaches the output inside whatever typedef or enclosing declaration
//! carries them. Bodies owned by a `typedef` are the typedef parser's.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::parser::balance;
use crate::types::{Area, Entity, EntityKind, IdAllocator};

static RE_STRUCT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(struct|union)\s+([A-Za-z_][A-Za-z0-9_]*)\s*\{").unwrap()
});

pub fn parse(text: &str, area: Area, alloc: &mut IdAllocator) -> Vec<Entity> {
    let bytes = text.as_bytes();
    let mut out = Vec::new();
    let mut cursor = 0usize;

    while let Some(caps) = RE_STRUCT.captures_at(text, cursor) {
        let m = caps.get(0).unwrap();
        // Scan nested definitions too: only step past the header
        cursor = m.end();

        if is_typedef_prefixed(text, m.start()) {
            continue;
        }

        let brace = m.end() - 1;
        let body_end = match balance::close_of(bytes, brace, b'{', b'}') {
            Some(e) => e,
            None => continue, // unterminated body
        };

        let after = balance::skip_ws(bytes, body_end);
        let code = if after < bytes.len() && bytes[after] == b';' {
            text[m.start()..after + 1].to_string()
        } else {
            format!("{};", &text[m.start()..body_end])
        };

        let name = caps.get(2).unwrap().as_str().to_string();
        out.push(Entity::new(
            alloc.next_id(),
            EntityKind::Struct,
            area,
            name,
            code,
        ));
    }
    out
}

/// True when the token right before `pos` is `typedef`.
fn is_typedef_prefixed(text: &str, pos: usize) -> bool {
    matches!(balance::ident_ending_before(text, pos), Some((_, "typedef")))
}
