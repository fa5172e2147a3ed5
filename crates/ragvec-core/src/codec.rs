//! Text form of a vector as exchanged with pgvector: `[v0,v1,...,vn]`.

use std::fmt::Write;

use crate::RagError;

/// Fractional digits written per component.
pub const LITERAL_PRECISION: usize = 6;

/// Format a vector as a pgvector literal, e.g. `[1.000000,0.500000]`.
///
/// The result is meant to be bound as a query parameter (`$n::vector`), not
/// spliced into SQL text.
pub fn encode_vector(vector: &[f32]) -> String {
    let mut literal = String::with_capacity(2 + vector.len() * (LITERAL_PRECISION + 4));
    literal.push('[');
    for (i, value) in vector.iter().enumerate() {
        if i > 0 {
            literal.push(',');
        }
        // Writing into a String cannot fail.
        let _ = write!(literal, "{value:.prec$}", prec = LITERAL_PRECISION);
    }
    literal.push(']');
    literal
}

/// Parse a pgvector literal back into a vector.
///
/// Every component must parse as a finite number; a bad component is reported
/// with its position instead of being read as zero.
pub fn decode_vector(literal: &str) -> Result<Vec<f32>, RagError> {
    let trimmed = literal.trim();
    let inner = trimmed
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
        .ok_or_else(|| RagError::MalformedVectorLiteral {
            component: None,
            reason: format!("expected a bracketed list, got {trimmed:?}"),
        })?;

    if inner.trim().is_empty() {
        return Ok(Vec::new());
    }

    inner
        .split(',')
        .enumerate()
        .map(|(i, raw)| {
            let component = raw.trim();
            let value: f32 = component
                .parse()
                .map_err(|e| RagError::MalformedVectorLiteral {
                    component: Some(i),
                    reason: format!("component {i} ({component:?}): {e}"),
                })?;
            if !value.is_finite() {
                return Err(RagError::MalformedVectorLiteral {
                    component: Some(i),
                    reason: format!("component {i} ({component:?}) is not finite"),
                });
            }
            Ok(value)
        })
        .collect()
}
