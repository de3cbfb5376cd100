//! Bounds-checked reading helpers shared by the binary codecs.

use crate::{HeaderField, MessageHeader, MessageKind, ProtocolError};

pub(crate) fn ensure(buf: &[u8], needed: usize) -> Result<(), ProtocolError> {
    if buf.len() < needed {
        return Err(ProtocolError::Truncated {
            needed,
            remaining: buf.len(),
        });
    }
    Ok(())
}

/// Splits `len` bytes off the front of `buf`.
pub(crate) fn take<'a>(buf: &mut &'a [u8], len: usize) -> Result<&'a [u8], ProtocolError> {
    let current: &'a [u8] = *buf;
    ensure(current, len)?;
    let (head, tail) = current.split_at(len);
    *buf = tail;
    Ok(head)
}

pub(crate) fn utf8<'a>(bytes: &'a [u8], field: &'static str) -> Result<&'a str, ProtocolError> {
    std::str::from_utf8(bytes).map_err(|_| ProtocolError::InvalidUtf8 { field })
}

/// `needed = count * width`, failing as truncation when it overflows.
pub(crate) fn ensure_array(
    buf: &[u8],
    count: usize,
    width: usize,
) -> Result<(), ProtocolError> {
    let needed = count.checked_mul(width).unwrap_or(usize::MAX);
    ensure(buf, needed)
}

/// Checks the schema id and resolves the message kind.
pub(crate) fn check_schema(
    header: &MessageHeader,
    schema_id: u16,
) -> Result<MessageKind, ProtocolError> {
    if header.schema_id != schema_id {
        return Err(ProtocolError::ProtocolMismatch {
            field: HeaderField::SchemaId,
            expected: schema_id,
            actual: header.schema_id,
        });
    }
    header.kind()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_advances_and_bounds_checks() {
        let data = [1u8, 2, 3, 4, 5];
        let mut buf = &data[..];
        assert_eq!(take(&mut buf, 2).unwrap(), &[1, 2]);
        assert_eq!(buf, &[3, 4, 5]);
        assert!(matches!(
            take(&mut buf, 4),
            Err(ProtocolError::Truncated {
                needed: 4,
                remaining: 3
            })
        ));
    }

    #[test]
    fn test_ensure_array_overflow_is_truncation() {
        assert!(ensure_array(&[0u8; 8], usize::MAX, 4).is_err());
        assert!(ensure_array(&[0u8; 8], 2, 4).is_ok());
    }
}
