//! Enum extraction.
//!
//! Enums get the greedy treatment: every `enum [NAME] { ... }` body in the
//! text is an entity, including bodies nested in struct declarations, so
//! that the constants of an anonymous enum stay indexable. An anonymous
//! body receives a synthetic per-body name; the constants join the
//! identifier set either way.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::parser::balance;
use crate::types::{Area, Entity, EntityKind, IdAllocator};

static RE_ENUM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\benum(\s+[A-Za-z_][A-Za-z0-9_]*)?\s*\{").unwrap());

pub fn parse(text: &str, area: Area, alloc: &mut IdAllocator) -> Vec<Entity> {
    let bytes = text.as_bytes();
    let mut out = Vec::new();
    let mut cursor = 0usize;
    let mut anon_count = 0usize;

    while let Some(caps) = RE_ENUM.captures_at(text, cursor) {
        let m = caps.get(0).unwrap();
        let brace = m.end() - 1;
        let body_end = match balance::close_of(bytes, brace, b'{', b'}') {
            Some(e) => e,
            None => break, // unterminated body at EOF
        };

        // Include the terminating `;` when it directly follows the body
        let after = balance::skip_ws(bytes, body_end);
        let (end, code) = if after < bytes.len() && bytes[after] == b';' {
            (after + 1, text[m.start()..after + 1].to_string())
        } else {
            (body_end, format!("{};", &text[m.start()..body_end]))
        };
        cursor = end;

        let name = match caps.get(1) {
            Some(tag) => tag.as_str().trim().to_string(),
            None => {
                let synthetic = format!("__anon_enum_{}", anon_count);
                anon_count += 1;
                synthetic
            }
        };

        let mut entity = Entity::new(alloc.next_id(), EntityKind::Enum, area, name, code);
        for constant in constants_of(&text[brace + 1..body_end - 1]) {
            entity.ids.insert(constant);
        }
        out.push(entity);
    }
    out
}

/// The constant names of an enum body: the first identifier of every
/// top-level comma-separated item.
fn constants_of(body: &str) -> Vec<String> {
    let bytes = body.as_bytes();
    let mut constants = Vec::new();
    let mut depth = 0usize;
    let mut item_start = 0usize;
    let mut i = 0usize;

    let mut flush = |start: usize, end: usize, constants: &mut Vec<String>| {
        let item = &body[start..end];
        let at = balance::skip_ws(item.as_bytes(), 0);
        if let Some(name) = balance::ident_at(item, at) {
            constants.push(name.to_string());
        }
    };

    while i < bytes.len() {
        match bytes[i] {
            b'(' | b'{' | b'[' => depth += 1,
            b')' | b'}' | b']' => depth = depth.saturating_sub(1),
            b',' if depth == 0 => {
                flush(item_start, i, &mut constants);
                item_start = i + 1;
            }
            _ => {}
        }
        i += 1;
    }
    flush(item_start, bytes.len(), &mut constants);
    constants
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_module(text: &str) -> Vec<Entity> {
        let mut alloc = IdAllocator::new(Area::Module);
        parse(text, Area::Module, &mut alloc)
    }

    #[test]
    fn test_named_enum() {
        let entities = parse_module("enum state { IDLE, RUNNING, DONE };\n");
        assert_eq!(entities.len(), 1);
        assert_eq!(entities[0].name, "state");
        assert!(entities[0].ids.contains("state"));
        assert!(entities[0].ids.contains("IDLE"));
        assert!(entities[0].ids.contains("RUNNING"));
        assert!(entities[0].ids.contains("DONE"));
        assert_eq!(entities[0].code, "enum state { IDLE, RUNNING, DONE };");
    }

    #[test]
    fn test_anonymous_enum_synthetic_names() {
        let entities = parse_module("enum { A };\nenum { B };\n");
        assert_eq!(entities.len(), 2);
        assert_ne!(entities[0].name, entities[1].name);
        assert!(entities[0].ids.contains("A"));
        assert!(entities[1].ids.contains("B"));
    }

    #[test]
    fn test_constants_with_values() {
        let entities = parse_module("enum flags { F_A = 1, F_B = (1 << 2), F_C = F_A | F_B };");
        assert_eq!(entities.len(), 1);
        let ids = &entities[0].ids;
        assert!(ids.contains("F_A"));
        assert!(ids.contains("F_B"));
        assert!(ids.contains("F_C"));
        // Value expressions are not constants
        assert_eq!(ids.len(), 4); // name + 3 constants
    }

    #[test]
    fn test_anonymous_enum_inside_struct() {
        let text = "struct holder {\n    enum { NESTED_A, NESTED_B } which;\n    int x;\n};\n";
        let entities = parse_module(text);
        assert_eq!(entities.len(), 1);
        assert!(entities[0].ids.contains("NESTED_A"));
        assert!(entities[0].ids.contains("NESTED_B"));
    }

    #[test]
    fn test_trailing_comma() {
        let entities = parse_module("enum e { ONE, TWO, };");
        assert_eq!(entities.len(), 1);
        // Trailing comma yields no phantom constant
        assert_eq!(entities[0].ids.len(), 3);
    }

    #[test]
    fn test_body_without_semicolon_gets_one() {
        let entities = parse_module("enum tag { X } var;\n");
        assert_eq!(entities.len(), 1);
        assert_eq!(entities[0].code, "enum tag { X };");
    }
}
