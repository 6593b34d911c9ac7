use blindpdp_core::SlotVector;

use crate::error::{MatchError, MatchResult};

/// Encode `text` at slot 0, one Unicode scalar value per slot, zero-padded
/// to `capacity`.
pub fn encode(text: &str, capacity: usize, plain_modulus: u64) -> MatchResult<SlotVector> {
    let chars: Vec<char> = text.chars().collect();
    encode_chars(&chars, capacity, plain_modulus)
}

/// Same as [`encode`] for an already-split character sequence. Used to encode
/// suffixes without re-walking the string.
pub fn encode_chars(chars: &[char], capacity: usize, plain_modulus: u64) -> MatchResult<SlotVector> {
    if chars.len() > capacity {
        return Err(MatchError::EncodingOverflow {
            len: chars.len(),
            capacity,
        });
    }
    let mut slots = SlotVector::zeroed(capacity);
    for (position, (slot, &ch)) in slots.as_mut_slice().iter_mut().zip(chars).enumerate() {
        let code = u64::from(u32::from(ch));
        // 0 is the empty-slot sentinel.
        if code == 0 || code >= plain_modulus {
            return Err(MatchError::InvalidCharacter { position });
        }
        *slot = code;
    }
    Ok(slots)
}

/// Inverse of [`encode`], reading up to the first empty slot.
pub fn decode(slots: &SlotVector) -> String {
    slots
        .as_slice()
        .iter()
        .take_while(|&&v| v != 0)
        .map(|&v| {
            u32::try_from(v)
                .ok()
                .and_then(char::from_u32)
                .unwrap_or(char::REPLACEMENT_CHARACTER)
        })
        .collect()
}

/// Length of a literal as the store and matcher count it.
pub fn char_len(text: &str) -> usize {
    text.chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    const T: u64 = 1 << 21;

    #[test]
    fn test_encode_positions_and_padding() {
        let slots = encode("abc", 8, T).unwrap();
        assert_eq!(slots.as_slice(), &[97, 98, 99, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn test_encode_empty() {
        assert!(encode("", 4, T).unwrap().is_zero());
    }

    #[test]
    fn test_encode_overflow() {
        let err = encode("abcde", 4, T).unwrap_err();
        assert!(matches!(
            err,
            MatchError::EncodingOverflow {
                len: 5,
                capacity: 4
            }
        ));
    }

    #[test]
    fn test_encode_exact_capacity() {
        assert!(encode("abcd", 4, T).is_ok());
    }

    #[test]
    fn test_counts_characters_not_bytes() {
        let slots = encode("é/ü", 4, T).unwrap();
        assert_eq!(slots.as_slice(), &[0xE9, 0x2F, 0xFC, 0]);
        assert_eq!(char_len("é/ü"), 3);
    }

    #[test]
    fn test_rejects_nul() {
        let err = encode("a\0b", 8, T).unwrap_err();
        assert!(matches!(err, MatchError::InvalidCharacter { position: 1 }));
    }

    #[test]
    fn test_rejects_code_above_modulus() {
        let err = encode("a😀", 8, 256).unwrap_err();
        assert!(matches!(err, MatchError::InvalidCharacter { position: 1 }));
    }

    #[test]
    fn test_decode_roundtrip() {
        let text = "/subscriptions/😀/resourceGroups";
        let slots = encode(text, 64, T).unwrap();
        assert_eq!(decode(&slots), text);
    }
}
