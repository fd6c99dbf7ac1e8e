use tracing::info;

use super::pattern::{Pattern, TokenKind};
use crate::error::{CapacityError, MaskResult};

/// Pads `pattern` up to `target` output positions by repeating its last
/// literal, escape, class or bracket group.
///
/// `?w` never counts towards the length, so a pattern made only of parent
/// word splices cannot be stretched.
pub fn stretch(pattern: &Pattern, target: usize) -> MaskResult<Pattern> {
    let len = pattern.effective_len();
    if len >= target {
        return Ok(pattern.clone());
    }

    let tokens = pattern.tokens();
    let last = tokens
        .iter()
        .rev()
        .find(|t| !matches!(t.kind, TokenKind::Word { .. }))
        .ok_or_else(|| CapacityError::UnsatisfiableLength {
            requested: target,
            reason: "pattern has no position to repeat".to_string(),
        })?;

    let piece = &pattern.text()[last.start..last.end];
    let mut text = pattern.text().to_vec();
    for _ in len..target {
        text.extend_from_slice(piece);
    }

    let stretched = Pattern::parse(text)?;
    info!(
        "Stretched mask to length {}: {}",
        target,
        stretched.display()
    );
    Ok(stretched)
}
