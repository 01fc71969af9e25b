//! Reversible escrow of comments, literals, attributes and macro lines.
//!
//! The entity parsers are regex-grade: they must never match inside a comment
//! or string literal and must not trip over preprocessor lines. Each class of
//! offender is swapped for a `<sentinel><index><sentinel>` placeholder whose
//! sentinel lies outside the C identifier alphabet, and the original text is
//! kept in a dense per-class table. Emission restores everything verbatim.
//!
//! Adaptation order is fixed (comments, strings, attributes, macro lines):
//! a later class can contain placeholders of an earlier one but never raw
//! text of it, so restoring in reverse order is exact.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::parser::balance;

/// A class of escrowed text.
#[derive(
    Debug, Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize,
)]
pub enum EscrowClass {
    Comment,
    Str,
    Attribute,
    MacroLine,
}

impl EscrowClass {
    /// Placeholder sentinel. None of these can occur in comment- and
    /// string-free C text, and all pass through the downstream regexes
    /// untouched.
    pub fn sentinel(self) -> char {
        match self {
            EscrowClass::Comment => '@',
            EscrowClass::Str => '`',
            EscrowClass::Attribute => '\u{1}',
            EscrowClass::MacroLine => '\u{2}',
        }
    }

    /// Fixed adaptation order.
    pub const ORDER: [EscrowClass; 4] = [
        EscrowClass::Comment,
        EscrowClass::Str,
        EscrowClass::Attribute,
        EscrowClass::MacroLine,
    ];
}

/// The per-class escrow tables of one adapted source blob.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EscrowTables {
    tables: BTreeMap<EscrowClass, Vec<String>>,
}

impl EscrowTables {
    pub fn get(&self, class: EscrowClass) -> &[String] {
        self.tables.get(&class).map(|v| v.as_slice()).unwrap_or(&[])
    }

    fn set(&mut self, class: EscrowClass, table: Vec<String>) {
        self.tables.insert(class, table);
    }
}

/// Adapted text plus the escrow tables needed to restore it. Passed by move
/// through the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdaptedText {
    pub body: String,
    pub escrows: EscrowTables,
}

/// Escrow every class in the fixed order.
pub fn adapt_all(text: &str) -> AdaptedText {
    let mut body = text.to_string();
    let mut escrows = EscrowTables::default();
    for class in EscrowClass::ORDER {
        let (next, table) = adapt(&body, class);
        body = next;
        escrows.set(class, table);
    }
    AdaptedText { body, escrows }
}

/// Escrow one class: returns the adapted text and the dense index table.
pub fn adapt(text: &str, class: EscrowClass) -> (String, Vec<String>) {
    match class {
        EscrowClass::Comment => adapt_comments(text),
        EscrowClass::Str => adapt_strings(text),
        EscrowClass::Attribute => adapt_attributes(text),
        EscrowClass::MacroLine => adapt_macro_lines(text),
    }
}

/// Restore every class, reverse adaptation order.
pub fn restore(text: &str, escrows: &EscrowTables) -> String {
    let mut out = text.to_string();
    for class in EscrowClass::ORDER.iter().rev() {
        out = restore_one(&out, *class, escrows.get(*class));
    }
    out
}

/// Substitute the placeholders of one class back for their originals.
pub fn restore_one(text: &str, class: EscrowClass, table: &[String]) -> String {
    let sentinel = class.sentinel();
    let slen = sentinel.len_utf8();
    let bytes = text.as_bytes();
    let sbyte_first = {
        let mut buf = [0u8; 4];
        sentinel.encode_utf8(&mut buf);
        buf[0]
    };

    let mut out = String::with_capacity(text.len());
    let mut run_start = 0usize;
    let mut i = 0usize;
    while i < bytes.len() {
        if bytes[i] == sbyte_first && text[i..].starts_with(sentinel) {
            // Parse <sentinel><digits><sentinel>
            let digit_start = i + slen;
            let mut j = digit_start;
            while j < bytes.len() && bytes[j].is_ascii_digit() {
                j += 1;
            }
            if j > digit_start && text[j..].starts_with(sentinel) {
                if let Ok(index) = text[digit_start..j].parse::<usize>() {
                    if let Some(original) = table.get(index) {
                        out.push_str(&text[run_start..i]);
                        out.push_str(original);
                        i = j + slen;
                        run_start = i;
                        continue;
                    }
                }
            }
        }
        i += 1;
    }
    out.push_str(&text[run_start..]);
    out
}

fn placeholder(class: EscrowClass, index: usize) -> String {
    let s = class.sentinel();
    format!("{}{}{}", s, index, s)
}

/// Escrow `/* ... */` and `// ...` comments, skipping string and char
/// literals so a quote inside a comment (or a `//` inside a string) cannot
/// confuse the scan.
fn adapt_comments(text: &str) -> (String, Vec<String>) {
    let bytes = text.as_bytes();
    let mut out = String::with_capacity(text.len());
    let mut table = Vec::new();
    let mut run_start = 0usize;
    let mut i = 0usize;

    while i < bytes.len() {
        match bytes[i] {
            b'"' | b'\'' => {
                i = skip_literal(bytes, i);
            }
            b'/' if i + 1 < bytes.len() && bytes[i + 1] == b'*' => {
                let mut j = i + 2;
                let mut terminated = false;
                while j < bytes.len() {
                    if bytes[j] == b'*' && j + 1 < bytes.len() && bytes[j + 1] == b'/' {
                        j += 2;
                        terminated = true;
                        break;
                    }
                    j += 1;
                }
                if !terminated {
                    j = bytes.len(); // unterminated comment runs to EOF
                }
                out.push_str(&text[run_start..i]);
                out.push_str(&placeholder(EscrowClass::Comment, table.len()));
                table.push(text[i..j].to_string());
                i = j;
                run_start = i;
            }
            b'/' if i + 1 < bytes.len() && bytes[i + 1] == b'/' => {
                // Up to the first unescaped newline
                let mut j = i + 2;
                while j < bytes.len() {
                    if bytes[j] == b'\n' && bytes[j - 1] != b'\\' {
                        break;
                    }
                    j += 1;
                }
                out.push_str(&text[run_start..i]);
                out.push_str(&placeholder(EscrowClass::Comment, table.len()));
                table.push(text[i..j].to_string());
                i = j;
                run_start = i;
            }
            _ => i += 1,
        }
    }
    out.push_str(&text[run_start..]);
    (out, table)
}

/// Escrow string and char literals (comments are already gone).
fn adapt_strings(text: &str) -> (String, Vec<String>) {
    let bytes = text.as_bytes();
    let mut out = String::with_capacity(text.len());
    let mut table = Vec::new();
    let mut run_start = 0usize;
    let mut i = 0usize;

    while i < bytes.len() {
        if bytes[i] == b'"' || bytes[i] == b'\'' {
            let end = skip_literal(bytes, i);
            out.push_str(&text[run_start..i]);
            out.push_str(&placeholder(EscrowClass::Str, table.len()));
            table.push(text[i..end].to_string());
            i = end;
            run_start = i;
        } else {
            i += 1;
        }
    }
    out.push_str(&text[run_start..]);
    (out, table)
}

// Attribute prefixes. Forms ending in '(' are consumed through the matching
// close paren; bare forms are taken as matched.
static RE_ATTRIBUTE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\b(?:__attribute__\s*\(|__acquires\s*\(|__releases\s*\(|__attribute_const__\b|CONSTF\b)",
    )
    .unwrap()
});

/// Escrow `__attribute__((...))` and friends.
fn adapt_attributes(text: &str) -> (String, Vec<String>) {
    let bytes = text.as_bytes();
    let mut out = String::with_capacity(text.len());
    let mut table = Vec::new();
    let mut run_start = 0usize;
    let mut cursor = 0usize;

    while let Some(m) = RE_ATTRIBUTE.find_at(text, cursor) {
        let end = if text[m.start()..m.end()].ends_with('(') {
            match balance::close_of(bytes, m.end() - 1, b'(', b')') {
                Some(e) => e,
                None => {
                    // Unbalanced attribute: leave it alone
                    cursor = m.end();
                    continue;
                }
            }
        } else {
            m.end()
        };
        out.push_str(&text[run_start..m.start()]);
        out.push_str(&placeholder(EscrowClass::Attribute, table.len()));
        table.push(text[m.start()..end].to_string());
        cursor = end;
        run_start = end;
    }
    out.push_str(&text[run_start..]);
    (out, table)
}

/// Escrow `#...` lines, honouring trailing-backslash continuations. The
/// placeholder replaces the directive text; surrounding newlines stay in
/// the body.
fn adapt_macro_lines(text: &str) -> (String, Vec<String>) {
    let bytes = text.as_bytes();
    let mut out = String::with_capacity(text.len());
    let mut table = Vec::new();
    let mut run_start = 0usize;
    let mut i = 0usize;
    let mut at_line_start = true;

    while i < bytes.len() {
        if at_line_start {
            // Skip leading whitespace of the line
            let mut j = i;
            while j < bytes.len() && (bytes[j] == b' ' || bytes[j] == b'\t') {
                j += 1;
            }
            if j < bytes.len() && bytes[j] == b'#' {
                // Consume through continuations, excluding the final newline
                let mut end = j;
                while end < bytes.len() {
                    if bytes[end] == b'\n' {
                        if end > j && bytes[end - 1] == b'\\' {
                            end += 1;
                            continue;
                        }
                        break;
                    }
                    end += 1;
                }
                out.push_str(&text[run_start..j]);
                out.push_str(&placeholder(EscrowClass::MacroLine, table.len()));
                table.push(text[j..end].to_string());
                i = end;
                run_start = i;
                at_line_start = false;
                continue;
            }
        }
        at_line_start = bytes[i] == b'\n';
        i += 1;
    }
    out.push_str(&text[run_start..]);
    (out, table)
}

/// Skip a string or char literal starting at `start`, returning the index
/// one past the closing quote. Standard C escaping.
fn skip_literal(bytes: &[u8], start: usize) -> usize {
    let quote = bytes[start];
    let mut i = start + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            c if c == quote => return i + 1,
            _ => i += 1,
        }
    }
    bytes.len()
}
