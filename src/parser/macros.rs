//! Macro entity extraction.
//!
//! Module macros come from the escrowed `#...` lines of the module's own
//! segments; kernel macros arrive pre-extracted from the external
//! preprocessor as raw `#define` fragments. Both paths end up here.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::escrow::{EscrowClass, EscrowTables};
use crate::types::{Area, Entity, EntityKind, IdAllocator};

static RE_DEFINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*#\s*define\s+([A-Za-z_][A-Za-z0-9_]*)").unwrap());

/// Build macro entities out of raw `#define` fragments. Other directives
/// (includes, linemarkers, pragmas) are skipped.
pub fn parse_fragments(
    fragments: &[String],
    area: Area,
    alloc: &mut IdAllocator,
) -> Vec<Entity> {
    let mut out = Vec::new();
    for fragment in fragments {
        let name = match RE_DEFINE.captures(fragment) {
            Some(caps) => caps.get(1).unwrap().as_str().to_string(),
            None => continue,
        };
        out.push(Entity::new(
            alloc.next_id(),
            EntityKind::Macro,
            area,
            name,
            fragment.clone(),
        ));
    }
    out
}

/// Collect the escrowed macro-line fragments referenced from `body`, in
/// order of appearance. Fragments keep any nested string/comment
/// placeholders; those restore at emission.
pub fn fragments_in(body: &str, escrows: &EscrowTables) -> Vec<String> {
    let table = escrows.get(EscrowClass::MacroLine);
    let sentinel = EscrowClass::MacroLine.sentinel() as u8;
    let bytes = body.as_bytes();
    let mut out = Vec::new();
    let mut i = 0usize;
    while i < bytes.len() {
        if bytes[i] == sentinel {
            let mut j = i + 1;
            while j < bytes.len() && bytes[j].is_ascii_digit() {
                j += 1;
            }
            if j > i + 1 && j < bytes.len() && bytes[j] == sentinel {
                if let Ok(index) = body[i + 1..j].parse::<usize>() {
                    if let Some(fragment) = table.get(index) {
                        out.push(fragment.clone());
                    }
                }
                i = j + 1;
                continue;
            }
        }
        i += 1;
    }
    out
}
