use tracing::{debug, warn};

use super::pattern::Pattern;
use crate::charset::{class_members, is_class_symbol, Encoding};
use crate::consts::{MAX_CUSTOM_PLACEHOLDERS, METACHARS};
use crate::error::{MaskResult, SyntaxError};

/// Inputs of the normalizer besides the pattern text itself.
#[derive(Debug, Clone, Copy)]
pub struct NormalizeContext<'a> {
    /// Definitions for `?1`..`?9`; an empty string leaves the slot undefined.
    pub custom: &'a [String],
    pub encoding: Encoding,
    pub case_sensitive: bool,
}

/// Runs the normalization pipeline on raw UTF-8 pattern text:
/// encoding conversion, custom placeholders, built-in classes inside
/// brackets, hex escapes, then bracket and quantifier scanning.
pub fn normalize(raw: &str, ctx: &NormalizeContext) -> MaskResult<Pattern> {
    let mask = ctx.encoding.from_utf8(raw)?;

    let mut definitions: Vec<Option<Vec<u8>>> = vec![None; MAX_CUSTOM_PLACEHOLDERS];
    for (slot, def) in ctx.custom.iter().take(MAX_CUSTOM_PLACEHOLDERS).enumerate() {
        if def.is_empty() {
            continue;
        }
        let bytes = ctx.encoding.from_utf8(def)?;
        reject_nested(&bytes, slot)?;
        definitions[slot] = Some(expand_definition(&bytes, ctx)?);
    }

    let mask = expand_custom(&mask, &definitions)?;
    let mask = expand_builtin_in_groups(&mask, ctx)?;
    let mask = decode_hex(&mask);
    debug!("Normalized mask: {}", String::from_utf8_lossy(&mask));

    Pattern::parse(mask)
}

fn push_escaped(out: &mut Vec<u8>, b: u8) {
    if METACHARS.contains(&b) {
        out.push(b'\\');
    }
    out.push(b);
}

fn reject_nested(def: &[u8], slot: usize) -> Result<(), SyntaxError> {
    let mut i = 0;
    while i < def.len() {
        match (def[i], def.get(i + 1)) {
            (b'\\', _) | (b'?', Some(b'?')) => i += 1,
            (b'?', Some(d)) if d.is_ascii_digit() && *d != b'0' => {
                return Err(SyntaxError::NestedPlaceholder((b'1' + slot as u8) as char));
            }
            _ => {}
        }
        i += 1;
    }
    Ok(())
}

/// Turns a custom definition into a single bracket group with every
/// built-in class spelled out: `?u?l` becomes `[AEIO...aeio...]`.
fn expand_definition(def: &[u8], ctx: &NormalizeContext) -> MaskResult<Vec<u8>> {
    let wrap = def.first() != Some(&b'[') || def.last() != Some(&b']');
    let mut out = Vec::with_capacity(def.len() * 4);
    if wrap {
        out.push(b'[');
    }

    let mut i = 0;
    while i < def.len() {
        match (def[i], def.get(i + 1).copied()) {
            (b'?', Some(b'?')) => {
                out.extend_from_slice(b"\\?");
                i += 2;
            }
            (b'\\', next) => {
                out.push(b'\\');
                out.extend(next);
                i += 2;
            }
            (b']', Some(b'[')) => i += 2,
            (b'?', Some(sym)) if is_class_symbol(sym) => {
                for b in class_members(sym, ctx.encoding, ctx.case_sensitive)? {
                    push_escaped(&mut out, b);
                }
                i += 2;
            }
            (b, _) => {
                out.push(b);
                i += 1;
            }
        }
    }

    if wrap {
        out.push(b']');
    }
    Ok(out)
}

/// Replaces `?1`..`?9` outside brackets with their definitions and rewrites
/// `??` to `\?`. Custom references inside a bracket list stay literal.
fn expand_custom(mask: &[u8], definitions: &[Option<Vec<u8>>]) -> MaskResult<Vec<u8>> {
    let mut out = Vec::with_capacity(mask.len());
    let mut depth = 0i32;
    let mut i = 0;

    while i < mask.len() {
        match (mask[i], mask.get(i + 1).copied()) {
            (b'?', Some(b'?')) => {
                out.extend_from_slice(b"\\?");
                i += 2;
            }
            (b'\\', next) => {
                out.push(b'\\');
                out.extend(next);
                i += 2;
            }
            (b'?', Some(d)) if depth == 0 && (b'1'..=b'9').contains(&d) => {
                let def = definitions[(d - b'1') as usize]
                    .as_ref()
                    .ok_or(SyntaxError::UndefinedPlaceholder(d as char))?;
                out.extend_from_slice(def);
                i += 2;
            }
            (b, next) => {
                match b {
                    b'[' if next == Some(b']') => return Err(SyntaxError::EmptyGroup.into()),
                    b'[' => depth += 1,
                    b']' => depth -= 1,
                    _ => {}
                }
                out.push(b);
                i += 1;
            }
        }
    }
    Ok(out)
}

/// Spells out built-in classes that sit inside a bracket list, so `[?d_]`
/// becomes `[1023985467_]`. Free-standing classes stay as quantifiers but are
/// checked here against the internal encoding.
fn expand_builtin_in_groups(mask: &[u8], ctx: &NormalizeContext) -> MaskResult<Vec<u8>> {
    let mut out = Vec::with_capacity(mask.len());
    let mut depth = 0i32;
    let mut i = 0;

    while i < mask.len() {
        match (mask[i], mask.get(i + 1).copied()) {
            (b'\\', next) => {
                out.push(b'\\');
                out.extend(next);
                i += 2;
            }
            (b'?', Some(sym)) if is_class_symbol(sym) => {
                let members = class_members(sym, ctx.encoding, ctx.case_sensitive)?;
                if depth > 0 {
                    for b in members {
                        push_escaped(&mut out, b);
                    }
                } else {
                    out.extend_from_slice(&[b'?', sym]);
                }
                i += 2;
            }
            (b, _) => {
                match b {
                    b'[' => depth += 1,
                    b']' if depth > 0 => depth -= 1,
                    _ => {}
                }
                out.push(b);
                i += 1;
            }
        }
    }
    Ok(out)
}

/// Decodes `\xHH`, keeping every other escape pair untouched so that `\\x41`
/// stays a literal backslash followed by `x41`. A decoded metacharacter is
/// escaped again, and `\x00` ends the pattern.
fn decode_hex(mask: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(mask.len());
    let mut i = 0;

    while i < mask.len() {
        if mask[i] != b'\\' {
            out.push(mask[i]);
            i += 1;
            continue;
        }
        let hex = mask
            .get(i + 1..i + 4)
            .filter(|s| s[0] == b'x' && s[1..].iter().all(u8::is_ascii_hexdigit))
            .and_then(|s| std::str::from_utf8(&s[1..]).ok())
            .and_then(|s| u8::from_str_radix(s, 16).ok());
        match hex {
            Some(0) => {
                warn!("\\x00 in mask terminates the string");
                break;
            }
            Some(b) => {
                push_escaped(&mut out, b);
                i += 4;
            }
            None => {
                out.extend(mask.get(i..(i + 2).min(mask.len())).unwrap_or_default());
                i += 2;
            }
        }
    }
    out
}
