//! Tag-length-value field encoding for payment codes

use crate::domain::DomainError;

/// Largest value a two-digit length prefix can describe
pub const MAX_FIELD_LENGTH: usize = 99;

/// Serialize one field as `<2-digit tag><2-digit length><value>`
pub fn field(tag: u8, value: &str) -> Result<String, DomainError> {
    if tag > 99 {
        return Err(DomainError::internal(format!("TLV tag {} out of range", tag)));
    }

    if value.len() > MAX_FIELD_LENGTH {
        return Err(DomainError::validation(format!(
            "TLV field {:02} is {} bytes long (max {})",
            tag,
            value.len(),
            MAX_FIELD_LENGTH
        )));
    }

    Ok(format!("{:02}{:02}{}", tag, value.len(), value))
}

/// Serialize inner fields first, then wrap them under `tag`
pub fn nested(tag: u8, children: &[(u8, &str)]) -> Result<String, DomainError> {
    let inner = children
        .iter()
        .map(|(child_tag, value)| field(*child_tag, value))
        .collect::<Result<String, _>>()?;

    field(tag, &inner)
}

/// Split a flat TLV string into `(tag, value)` pairs
#[cfg(test)]
pub fn parse(input: &str) -> Result<Vec<(u8, &str)>, DomainError> {
    let mut fields = Vec::new();
    let mut rest = input;

    while !rest.is_empty() {
        let (tag, len) = match (rest.get(..2), rest.get(2..4)) {
            (Some(tag), Some(len)) => (tag, len),
            _ => return Err(DomainError::validation("Truncated TLV header")),
        };
        let tag = tag
            .parse::<u8>()
            .map_err(|_| DomainError::validation(format!("Invalid TLV tag '{}'", tag)))?;
        let len = len
            .parse::<usize>()
            .map_err(|_| DomainError::validation(format!("Invalid TLV length '{}'", len)))?;
        let value = rest
            .get(4..4 + len)
            .ok_or_else(|| DomainError::validation(format!("Truncated TLV field {:02}", tag)))?;

        fields.push((tag, value));
        rest = &rest[4 + len..];
    }

    Ok(fields)
}
