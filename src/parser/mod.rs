//! Entity parsing: the per-kind parsers, the kernel/module area split and
//! the per-area parse drivers.
//!
//! All parsers are greedy-scan-then-classify over already-adapted text: they
//! search the whole text for matches of a prefix pattern and hand the rest
//! to a hand-written brace/paren balancer. The input has been preprocessed
//! and the escrow pass has removed comments, strings, attributes and
//! directive lines, which is what makes this regex-grade approach workable.

pub mod balance;
pub mod enums;
pub mod functions;
pub mod globals;
pub mod macros;
pub mod structs;
pub mod typedefs;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::debug_log;
use crate::escrow::{self, AdaptedText, EscrowClass, EscrowTables};
use crate::types::{Area, Entity, EntitySet, IdAllocator};

// GNU linemarker: # <line> "<file>" [flags]
static RE_LINEMARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"^\s*#\s*\d+\s+"([^"]*)""#).unwrap());

/// The preprocessed blob split into its two areas.
#[derive(Debug, Clone)]
pub struct AreaTexts {
    pub kernel: String,
    pub module: String,
}

/// Split the adapted blob into kernel and module area texts.
///
/// The preprocessor interleaves the module's own lines with inlined header
/// text and marks every switch with a linemarker. The file named by the
/// first linemarker is the module's primary file; its segments are Module
/// area, everything else is Kernel area. A blob without linemarkers is
/// entirely Module area.
pub fn split_areas(adapted: &AdaptedText) -> AreaTexts {
    let body = &adapted.body;
    let bytes = body.as_bytes();
    let macro_table = adapted.escrows.get(EscrowClass::MacroLine);
    let str_table = adapted.escrows.get(EscrowClass::Str);
    let sentinel = EscrowClass::MacroLine.sentinel() as u8;

    let mut kernel = String::new();
    let mut module = String::new();
    let mut in_module = true;
    let mut primary: Option<String> = None;

    let mut prev_end = 0usize;
    let mut i = 0usize;
    while i < bytes.len() {
        if bytes[i] == sentinel {
            let mut j = i + 1;
            while j < bytes.len() && bytes[j].is_ascii_digit() {
                j += 1;
            }
            if j > i + 1 && j < bytes.len() && bytes[j] == sentinel {
                let span_end = j + 1;
                let current = if in_module { &mut module } else { &mut kernel };
                current.push_str(&body[prev_end..i]);

                if let Ok(index) = body[i + 1..j].parse::<usize>() {
                    if let Some(directive) = macro_table.get(index) {
                        let resolved =
                            escrow::restore_one(directive, EscrowClass::Str, str_table);
                        if let Some(caps) = RE_LINEMARKER.captures(&resolved) {
                            let file = caps.get(1).unwrap().as_str().to_string();
                            if primary.is_none() {
                                primary = Some(file.clone());
                            }
                            in_module = primary.as_deref() == Some(file.as_str());
                        }
                    }
                }

                let current = if in_module { &mut module } else { &mut kernel };
                current.push_str(&body[i..span_end]);
                prev_end = span_end;
                i = span_end;
                continue;
            }
        }
        i += 1;
    }
    let current = if in_module { &mut module } else { &mut kernel };
    current.push_str(&body[prev_end..]);

    AreaTexts { kernel, module }
}

/// Parse the kernel area: types, globals and extern prototypes from the
/// inlined header text, macros from the pre-extracted kernel macro list.
pub fn parse_kernel_area(text: &str, kernel_macro_list: &[String]) -> EntitySet {
    let mut alloc = IdAllocator::new(Area::Kernel);
    let mut set = EntitySet::new(Area::Kernel);
    insert_all(
        &mut set,
        macros::parse_fragments(kernel_macro_list, Area::Kernel, &mut alloc),
    );
    insert_all(&mut set, typedefs::parse(text, Area::Kernel, &mut alloc));
    insert_all(&mut set, enums::parse(text, Area::Kernel, &mut alloc));
    insert_all(&mut set, structs::parse(text, Area::Kernel, &mut alloc));
    insert_all(&mut set, globals::parse(text, Area::Kernel, &mut alloc));
    insert_all(
        &mut set,
        functions::parse_extern_declarations(text, Area::Kernel, &mut alloc),
    );
    set
}

/// Parse the module area: every kind including function definitions; macros
/// come from the module's own escrowed `#define` lines.
pub fn parse_module_area(text: &str, escrows: &EscrowTables) -> EntitySet {
    let mut alloc = IdAllocator::new(Area::Module);
    let mut set = EntitySet::new(Area::Module);
    let fragments = macros::fragments_in(text, escrows);
    insert_all(
        &mut set,
        macros::parse_fragments(&fragments, Area::Module, &mut alloc),
    );
    insert_all(&mut set, typedefs::parse(text, Area::Module, &mut alloc));
    insert_all(&mut set, enums::parse(text, Area::Module, &mut alloc));
    insert_all(&mut set, structs::parse(text, Area::Module, &mut alloc));
    insert_all(&mut set, globals::parse(text, Area::Module, &mut alloc));
    insert_all(
        &mut set,
        functions::parse_definitions(text, Area::Module, &mut alloc),
    );
    set
}

/// Insert parsed entities under the keep-first duplicate policy, warning on
/// every rejection.
fn insert_all(set: &mut EntitySet, entities: Vec<Entity>) {
    for entity in entities {
        let kind = entity.kind;
        let area = entity.area;
        let name = entity.name.clone();
        if !set.insert(entity) {
            eprintln!(
                "Warning: duplicate {} '{}' in {} area, keeping the first occurrence",
                kind.label(),
                name,
                area.label()
            );
            debug_log!("duplicate {} '{}' dropped", kind.label(), name);
        }
    }
}
