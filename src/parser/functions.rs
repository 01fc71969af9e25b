//! Function definition and extern prototype extraction.
//!
//! A definition is `RET NAME(ARGS) [attribute junk] { BODY }` with balanced
//! parens and braces. The scan is greedy over the whole text; a successful
//! match consumes its body, so statements inside bodies are never visited.
//! Control-flow keywords that survive to file scope and look like a
//! definition are discarded with a warning.
//!
//! A function's search text deliberately leaves out its own name: the body,
//! argument list and return type are what other identifiers are looked up
//! in, so plain mentions of the function do not create a self edge (direct
//! recursion in the body still does, which the slicer ignores).

use once_cell::sync::Lazy;
use regex::Regex;

use crate::debug_log;
use crate::escrow::EscrowClass;
use crate::parser::balance;
use crate::types::{Area, Entity, EntityKind, IdAllocator};

static RE_CANDIDATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b([A-Za-z_][A-Za-z0-9_]*)\s*\(").unwrap());

static RE_EXTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bextern\b").unwrap());

/// Parse function definitions.
pub fn parse_definitions(text: &str, area: Area, alloc: &mut IdAllocator) -> Vec<Entity> {
    let bytes = text.as_bytes();
    let attr_sentinel = EscrowClass::Attribute.sentinel() as u8;
    let macro_sentinel = EscrowClass::MacroLine.sentinel() as u8;
    let mut out = Vec::new();
    let mut cursor = 0usize;

    while let Some(caps) = RE_CANDIDATE.captures_at(text, cursor) {
        let name_match = caps.get(1).unwrap();
        let whole = caps.get(0).unwrap();
        let paren = whole.end() - 1;

        let args_end = match balance::close_of(bytes, paren, b'(', b')') {
            Some(e) => e,
            None => {
                cursor = name_match.end();
                continue;
            }
        };
        let after = balance::skip_ws_and_placeholders(bytes, args_end, attr_sentinel);
        if after >= bytes.len() || bytes[after] != b'{' {
            cursor = name_match.end();
            continue;
        }
        let body_end = match balance::close_of(bytes, after, b'{', b'}') {
            Some(e) => e,
            None => {
                cursor = name_match.end();
                continue;
            }
        };

        let name = name_match.as_str();
        if crate::constants::is_c_keyword(name) {
            eprintln!(
                "Warning: control-flow keyword '{}' looked like a function definition, skipping",
                name
            );
            debug_log!("keyword false positive at byte {}", name_match.start());
            // Scan on inside the parens and braces
            cursor = args_end;
            continue;
        }

        // Return type: everything back to the previous construct boundary
        let mut boundary = name_match.start();
        while boundary > 0 {
            let b = bytes[boundary - 1];
            if b == b';' || b == b'}' || b == b'{' || b == macro_sentinel {
                break;
            }
            boundary -= 1;
        }
        let ret_start = balance::skip_ws(bytes, boundary);
        let code_start = if ret_start < name_match.start() {
            ret_start
        } else {
            name_match.start()
        };

        let ret_text = &text[code_start..name_match.start()];
        let args_text = &text[paren..args_end];
        let body_text = &text[after..body_end];

        let mut entity = Entity::new(
            alloc.next_id(),
            EntityKind::Function,
            area,
            name.to_string(),
            text[code_start..body_end].to_string(),
        );
        entity.tags = format!("{} {} {}", ret_text, args_text, body_text);
        out.push(entity);

        cursor = body_end;
    }
    out
}

/// Parse `extern [inline] RET NAME(ARGS);` prototypes (kernel area).
pub fn parse_extern_declarations(text: &str, area: Area, alloc: &mut IdAllocator) -> Vec<Entity> {
    let bytes = text.as_bytes();
    let mut out = Vec::new();
    let mut cursor = 0usize;

    while let Some(m) = RE_EXTERN.find_at(text, cursor) {
        let semi = match bytes[m.end()..].iter().position(|&b| b == b';') {
            Some(off) => m.end() + off,
            None => break,
        };
        cursor = semi + 1;

        let seg = &text[m.start()..semi];
        let paren = match seg.as_bytes().iter().position(|&b| b == b'(') {
            Some(p) => p,
            None => continue, // extern variable, the global parser's
        };
        let name = match balance::ident_ending_before(seg, paren) {
            Some((_, n)) if !crate::constants::is_c_keyword(n) => n.to_string(),
            _ => {
                debug_log!("extern declaration without a plain name skipped: {}", seg);
                continue;
            }
        };

        out.push(Entity::new(
            alloc.next_id(),
            EntityKind::Declaration,
            area,
            name,
            text[m.start()..semi + 1].to_string(),
        ));
    }
    out
}

/// The prototype of a function definition: its code up to the opening brace,
/// attribute junk stripped, with a `;` appended. Also serves as the forward
/// declaration text when a mutual-recursion cycle is broken.
pub fn prototype_of(code: &str) -> Option<String> {
    let brace = code.as_bytes().iter().position(|&b| b == b'{')?;
    let mut head = code[..brace].trim_end();

    // Strip trailing escrowed attribute placeholders
    let sentinel = EscrowClass::Attribute.sentinel();
    loop {
        head = head.trim_end();
        if head.ends_with(sentinel) {
            let without = &head[..head.len() - sentinel.len_utf8()];
            let digits = without.trim_end_matches(|c: char| c.is_ascii_digit());
            if digits.len() < without.len() && digits.ends_with(sentinel) {
                head = &digits[..digits.len() - sentinel.len_utf8()];
                continue;
            }
        }
        break;
    }

    if !head.ends_with(')') {
        return None;
    }
    Some(format!("{};", head))
}
