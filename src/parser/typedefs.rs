//! Typedef extraction.
//!
//! Handles `typedef ... NAME;`, function-pointer typedefs
//! `typedef ... (*NAME)(...);` and body-defining typedefs
//! `typedef struct [TAG] { ... } NAME;`. A body-defining typedef also
//! defines its tag, so the tag joins the entity's identifier set.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::debug_log;
use crate::parser::balance;
use crate::types::{Area, Entity, EntityKind, IdAllocator};

static RE_TYPEDEF: Lazy<Regex> = Lazy::new(|| Regex::new(r"\btypedef\b").unwrap());

// (*NAME) — the declared name of a function-pointer typedef
static RE_FNPTR_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\(\s*\*\s*([A-Za-z_][A-Za-z0-9_]*)\s*(?:\[[^\]]*\]\s*)?\)").unwrap());

// struct|union|enum TAG { — a tag defined by this typedef's body
static RE_BODY_TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(struct|union|enum)\s+([A-Za-z_][A-Za-z0-9_]*)\s*\{").unwrap()
});

pub fn parse(text: &str, area: Area, alloc: &mut IdAllocator) -> Vec<Entity> {
    let bytes = text.as_bytes();
    let mut out = Vec::new();
    let mut cursor = 0usize;

    while let Some(m) = RE_TYPEDEF.find_at(text, cursor) {
        // Consume to the terminating `;`, skipping brace groups
        let mut i = m.end();
        let mut end = None;
        while i < bytes.len() {
            match bytes[i] {
                b'{' => match balance::close_of(bytes, i, b'{', b'}') {
                    Some(e) => i = e,
                    None => {
                        i = bytes.len();
                    }
                },
                b';' => {
                    end = Some(i + 1);
                    break;
                }
                _ => i += 1,
            }
        }
        let end = match end {
            Some(e) => e,
            None => break, // unterminated typedef at EOF
        };
        let code = &text[m.start()..end];
        cursor = end;

        // Mask brace bodies so declarators inside them cannot win the name
        let masked = mask_braces(code);
        let declarator = masked.trim_end_matches(|c: char| c == ';' || c.is_whitespace());

        let name = match RE_FNPTR_NAME.captures(declarator) {
            Some(caps) => Some(caps.get(1).unwrap().as_str()),
            None => balance::last_ident(declarator),
        };
        let name = match name {
            Some(n) if !crate::constants::is_c_keyword(n) => n.to_string(),
            _ => {
                debug_log!("typedef without a usable name skipped: {}", code.trim());
                continue;
            }
        };

        let mut entity = Entity::new(
            alloc.next_id(),
            EntityKind::Typedef,
            area,
            name,
            code.to_string(),
        );
        if let Some(caps) = RE_BODY_TAG.captures(code) {
            entity.ids.insert(caps.get(2).unwrap().as_str().to_string());
        }
        out.push(entity);
    }
    out
}

/// Replace every brace group (braces included) with spaces, preserving
/// length, so name extraction only sees the outer declarator.
fn mask_braces(code: &str) -> String {
    let bytes = code.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut depth = 0usize;
    for &b in bytes {
        if b == b'{' {
            depth += 1;
            out.push(b' ');
        } else if b == b'}' {
            depth = depth.saturating_sub(1);
            out.push(b' ');
        } else if depth > 0 {
            // Preserve newlines so the mask stays printable in debug dumps
            out.push(if b == b'\n' { b'\n' } else { b' ' });
        } else {
            out.push(b);
        }
    }
    String::from_utf8(out).unwrap_or_else(|_| code.to_string())
}
