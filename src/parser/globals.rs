//! Global variable extraction.
//!
//! Walks the adapted text at brace depth zero and classifies each
//! `;`-terminated segment. Function definitions, prototypes, typedefs and
//! struct/enum/union definitions are someone else's; what remains is a
//! file-scope declarator, with or without an initialiser. `extern`
//! variables count as globals; `extern` prototypes do not.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::debug_log;
use crate::escrow::EscrowClass;
use crate::parser::balance;
use crate::types::{Area, Entity, EntityKind, IdAllocator};

static RE_FNPTR_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\(\s*\*\s*([A-Za-z_][A-Za-z0-9_]*)\s*(?:\[[^\]]*\]\s*)?\)").unwrap());

pub fn parse(text: &str, area: Area, alloc: &mut IdAllocator) -> Vec<Entity> {
    let bytes = text.as_bytes();
    let attr_sentinel = EscrowClass::Attribute.sentinel() as u8;
    let mut out = Vec::new();

    let mut i = 0usize;
    let mut seg_start = 0usize;
    let mut saw_eq = false;
    let mut saw_type_body = false;
    let mut last_nonws: Option<u8> = None;

    while i < bytes.len() {
        match bytes[i] {
            b'{' => {
                let end = balance::close_of(bytes, i, b'{', b'}').unwrap_or(bytes.len());
                if saw_eq {
                    // Initialiser braces, still the same declarator
                } else if last_nonws == Some(b')') || last_nonws == Some(attr_sentinel) {
                    // Function definition: restart after the body
                    i = end;
                    seg_start = i;
                    saw_eq = false;
                    saw_type_body = false;
                    last_nonws = None;
                    continue;
                } else {
                    // struct/union/enum body inside a declaration
                    saw_type_body = true;
                }
                i = end;
                last_nonws = Some(b'}');
            }
            b';' => {
                if !saw_type_body {
                    if let Some(entity) =
                        classify(&text[seg_start..i], saw_eq, area, alloc)
                    {
                        out.push(entity);
                    }
                }
                i += 1;
                seg_start = i;
                saw_eq = false;
                saw_type_body = false;
                last_nonws = None;
            }
            b'=' => {
                saw_eq = true;
                last_nonws = Some(b'=');
                i += 1;
            }
            b => {
                if !b.is_ascii_whitespace() {
                    last_nonws = Some(b);
                }
                i += 1;
            }
        }
    }
    out
}

/// Classify one depth-zero segment; Some(entity) when it is a global.
fn classify(seg: &str, saw_eq: bool, area: Area, alloc: &mut IdAllocator) -> Option<Entity> {
    // Directive placeholders glued to the front of the segment belong to no
    // declaration; strip them along with surrounding whitespace.
    let start = balance::skip_ws_and_placeholders(
        seg.as_bytes(),
        0,
        EscrowClass::MacroLine.sentinel() as u8,
    );
    let seg = seg[start..].trim();
    if seg.is_empty() {
        return None;
    }
    if balance::ident_at(seg, 0) == Some("typedef") {
        return None;
    }

    let eq_pos = if saw_eq { top_level_byte(seg, b'=') } else { None };
    let paren_pos = top_level_byte(seg, b'(');

    let name = match (eq_pos, paren_pos) {
        (Some(eq), paren) if paren.map_or(true, |p| eq < p) => {
            declarator_name_before(seg, eq)
        }
        (_, Some(paren)) => {
            match balance::ident_ending_before(seg, paren) {
                Some((_, name)) if !crate::constants::is_c_keyword(name) => {
                    // NAME(...) — a prototype, not a global
                    return None;
                }
                _ => {
                    // Function-pointer declarator: int (*fp)(void);
                    RE_FNPTR_NAME
                        .captures(seg)
                        .map(|caps| caps.get(1).unwrap().as_str().to_string())
                }
            }
        }
        (_, None) => balance::last_ident(seg).map(|s| s.to_string()),
    };

    let name = match name {
        Some(n) if !crate::constants::is_c_keyword(n.as_str()) => n,
        _ => {
            debug_log!("unclassifiable file-scope segment skipped: {}", seg);
            return None;
        }
    };

    Some(Entity::new(
        alloc.next_id(),
        EntityKind::Global,
        area,
        name,
        format!("{};", seg),
    ))
}

/// First occurrence of `needle` outside any bracket group.
fn top_level_byte(seg: &str, needle: u8) -> Option<usize> {
    let bytes = seg.as_bytes();
    let mut depth = 0usize;
    for (i, &b) in bytes.iter().enumerate() {
        match b {
            b'(' | b'{' | b'[' => {
                if b == needle && depth == 0 {
                    return Some(i);
                }
                depth += 1;
            }
            b')' | b'}' | b']' => depth = depth.saturating_sub(1),
            _ if b == needle && depth == 0 => return Some(i),
            _ => {}
        }
    }
    None
}

/// Declared name immediately left of `pos`, stepping over array dimensions.
fn declarator_name_before(seg: &str, pos: usize) -> Option<String> {
    let bytes = seg.as_bytes();
    let mut end = pos;
    while end > 0 && bytes[end - 1].is_ascii_whitespace() {
        end -= 1;
    }
    while end > 0 && bytes[end - 1] == b']' {
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
        while end > 0 && bytes[end - 1].is_ascii_whitespace() {
            end -= 1;
        }
    }
    balance::ident_ending_before(seg, end).map(|(_, s)| s.to_string())
}
