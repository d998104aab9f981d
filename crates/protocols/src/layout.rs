//! Fixed-offset account layouts.
//!
//! A layout is data: a list of named fields with byte offsets and types.
//! One generic routine slices and interprets them, so a program upgrade that
//! moves a field is a change to a constant, not to decoding code.

use solana_sdk::pubkey::Pubkey;
use std::collections::HashMap;
use thiserror::Error;

/// Wire type of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// 32-byte public key.
    Pubkey,
    /// Little-endian unsigned 64-bit integer.
    U64,
    /// Single byte.
    U8,
}

impl FieldKind {
    /// Width in bytes.
    #[must_use]
    pub const fn width(self) -> usize {
        match self {
            Self::Pubkey => 32,
            Self::U64 => 8,
            Self::U8 => 1,
        }
    }
}

/// One field of a layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    /// Field name used for lookup.
    pub name: &'static str,
    /// Byte offset from the start of account data.
    pub offset: usize,
    /// Field type.
    pub kind: FieldKind,
}

impl FieldSpec {
    /// Creates a field spec.
    #[must_use]
    pub const fn new(name: &'static str, offset: usize, kind: FieldKind) -> Self {
        Self { name, offset, kind }
    }

    const fn end(&self) -> usize {
        self.offset + self.kind.width()
    }
}

/// Schema of a fixed-size account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccountLayout {
    /// Human-readable layout name used in logs.
    pub name: &'static str,
    /// Exact data length the account must have.
    pub size: usize,
    /// Fields to decode.
    pub fields: &'static [FieldSpec],
}

/// A decoded field value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldValue {
    /// Public key.
    Pubkey(Pubkey),
    /// Unsigned 64-bit integer.
    U64(u64),
    /// Single byte.
    U8(u8),
}

/// Layout decoding errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LayoutError {
    /// Data length differs from the layout size.
    #[error("{layout}: expected {expected} bytes, got {actual}")]
    SizeMismatch {
        layout: &'static str,
        expected: usize,
        actual: usize,
    },
    /// A field lies outside the data.
    #[error("{layout}: field {field} at {offset} is out of bounds")]
    OutOfBounds {
        layout: &'static str,
        field: &'static str,
        offset: usize,
    },
    /// Requested field is not part of the layout.
    #[error("{layout}: no field named {field}")]
    MissingField {
        layout: &'static str,
        field: &'static str,
    },
    /// Field exists with a different type.
    #[error("{layout}: field {field} has type {actual:?}")]
    WrongType {
        layout: &'static str,
        field: &'static str,
        actual: FieldKind,
    },
}

/// Field values of one decoded account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedAccount {
    layout: &'static str,
    values: HashMap<&'static str, FieldValue>,
}

impl DecodedAccount {
    fn get(&self, field: &'static str) -> Result<FieldValue, LayoutError> {
        self.values
            .get(field)
            .copied()
            .ok_or(LayoutError::MissingField {
                layout: self.layout,
                field,
            })
    }

    /// Reads a pubkey field.
    pub fn pubkey(&self, field: &'static str) -> Result<Pubkey, LayoutError> {
        match self.get(field)? {
            FieldValue::Pubkey(key) => Ok(key),
            other => Err(self.wrong_type(field, other)),
        }
    }

    /// Reads a u64 field.
    pub fn u64(&self, field: &'static str) -> Result<u64, LayoutError> {
        match self.get(field)? {
            FieldValue::U64(value) => Ok(value),
            other => Err(self.wrong_type(field, other)),
        }
    }

    /// Reads a u8 field.
    pub fn u8(&self, field: &'static str) -> Result<u8, LayoutError> {
        match self.get(field)? {
            FieldValue::U8(value) => Ok(value),
            other => Err(self.wrong_type(field, other)),
        }
    }

    fn wrong_type(&self, field: &'static str, value: FieldValue) -> LayoutError {
        let actual = match value {
            FieldValue::Pubkey(_) => FieldKind::Pubkey,
            FieldValue::U64(_) => FieldKind::U64,
            FieldValue::U8(_) => FieldKind::U8,
        };
        LayoutError::WrongType {
            layout: self.layout,
            field,
            actual,
        }
    }
}

impl AccountLayout {
    /// Decodes `data` against this layout.
    ///
    /// The data length must equal `size` exactly.
    pub fn decode(&self, data: &[u8]) -> Result<DecodedAccount, LayoutError> {
        if data.len() != self.size {
            return Err(LayoutError::SizeMismatch {
                layout: self.name,
                expected: self.size,
                actual: data.len(),
            });
        }

        let mut values = HashMap::with_capacity(self.fields.len());
        for field in self.fields {
            let bytes = data
                .get(field.offset..field.end())
                .ok_or(LayoutError::OutOfBounds {
                    layout: self.name,
                    field: field.name,
                    offset: field.offset,
                })?;
            values.insert(field.name, read_field(field.kind, bytes));
        }

        Ok(DecodedAccount {
            layout: self.name,
            values,
        })
    }

    /// Returns a copy of this layout expecting a different account size.
    #[must_use]
    pub const fn with_size(self, size: usize) -> Self {
        Self { size, ..self }
    }
}

fn read_field(kind: FieldKind, bytes: &[u8]) -> FieldValue {
    match kind {
        FieldKind::Pubkey => {
            let mut raw = [0u8; 32];
            raw.copy_from_slice(bytes);
            FieldValue::Pubkey(Pubkey::new_from_array(raw))
        }
        FieldKind::U64 => {
            let mut raw = [0u8; 8];
            raw.copy_from_slice(bytes);
            FieldValue::U64(u64::from_le_bytes(raw))
        }
        FieldKind::U8 => FieldValue::U8(bytes[0]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_LAYOUT: AccountLayout = AccountLayout {
        name: "test",
        size: 48,
        fields: &[
            FieldSpec::new("key", 0, FieldKind::Pubkey),
            FieldSpec::new("amount", 32, FieldKind::U64),
            FieldSpec::new("flag", 40, FieldKind::U8),
        ],
    };

    #[test]
    fn test_decode_fields() {
        let key = Pubkey::new_unique();
        let mut data = vec![0u8; 48];
        data[..32].copy_from_slice(key.as_ref());
        data[32..40].copy_from_slice(&1_234_567u64.to_le_bytes());
        data[40] = 9;

        let decoded = TEST_LAYOUT.decode(&data).unwrap();
        assert_eq!(decoded.pubkey("key").unwrap(), key);
        assert_eq!(decoded.u64("amount").unwrap(), 1_234_567);
        assert_eq!(decoded.u8("flag").unwrap(), 9);
    }

    #[test]
    fn test_decode_rejects_wrong_size() {
        let err = TEST_LAYOUT.decode(&[0u8; 47]).unwrap_err();
        assert_eq!(
            err,
            LayoutError::SizeMismatch {
                layout: "test",
                expected: 48,
                actual: 47
            }
        );
    }

    #[test]
    fn test_out_of_bounds_field() {
        const SHORT: AccountLayout = AccountLayout {
            name: "short",
            size: 16,
            fields: &[FieldSpec::new("key", 0, FieldKind::Pubkey)],
        };
        let err = SHORT.decode(&[0u8; 16]).unwrap_err();
        assert!(matches!(err, LayoutError::OutOfBounds { field: "key", .. }));
    }

    #[test]
    fn test_type_and_name_checks() {
        let decoded = TEST_LAYOUT.decode(&[0u8; 48]).unwrap();
        assert!(matches!(
            decoded.u64("key"),
            Err(LayoutError::WrongType { .. })
        ));
        assert!(matches!(
            decoded.pubkey("nope"),
            Err(LayoutError::MissingField { .. })
        ));
    }
}
