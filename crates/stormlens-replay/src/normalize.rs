//! Recursive buffer-to-text normalization.

use stormlens_protocol::DecodedValue;

/// Rewrites every byte buffer in a decoded tree to text, preserving the
/// container shape.
///
/// Byte buffers become their (lossy) UTF-8 decoding; arrays normalize
/// element-wise keeping order and length; structs normalize every value
/// with keys untouched; scalars pass through unchanged. The function is
/// total and idempotent, and terminates on any decoded tree — decoders
/// only produce finite, acyclic values.
pub fn normalize(value: DecodedValue) -> DecodedValue {
    match value {
        DecodedValue::Bytes(bytes) => {
            DecodedValue::Text(String::from_utf8_lossy(&bytes).into_owned())
        }
        DecodedValue::Array(items) => {
            DecodedValue::Array(items.into_iter().map(normalize).collect())
        }
        DecodedValue::Struct(fields) => DecodedValue::Struct(
            fields
                .into_iter()
                .map(|(key, value)| (key, normalize(value)))
                .collect(),
        ),
        other => other,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::BTreeMap;

    #[test]
    fn bytes_become_text() {
        assert_eq!(
            normalize(DecodedValue::Bytes(b"Raynor".to_vec())),
            DecodedValue::Text("Raynor".to_owned())
        );
    }

    #[test]
    fn invalid_utf8_is_replaced_not_dropped() {
        let normalized = normalize(DecodedValue::Bytes(vec![0x52, 0xFF, 0x52]));
        let DecodedValue::Text(text) = normalized else {
            panic!("expected text");
        };
        assert!(text.starts_with('R') && text.ends_with('R'));
        assert_eq!(text.chars().count(), 3);
    }

    #[test]
    fn nested_containers_keep_their_shape() {
        let mut fields = BTreeMap::new();
        fields.insert("m_name".to_owned(), DecodedValue::Bytes(b"Muradin".to_vec()));
        fields.insert("m_teamId".to_owned(), DecodedValue::Int(1));
        let tree = DecodedValue::Array(vec![
            DecodedValue::Struct(fields),
            DecodedValue::Null,
            DecodedValue::Bool(false),
        ]);

        let normalized = normalize(tree);
        let items = normalized.as_array().expect("array");
        assert_eq!(items.len(), 3);
        assert_eq!(
            items[0].field("m_name"),
            Some(&DecodedValue::Text("Muradin".to_owned()))
        );
        assert_eq!(items[0].field("m_teamId"), Some(&DecodedValue::Int(1)));
        assert_eq!(items[1], DecodedValue::Null);
    }

    #[test]
    fn scalars_and_bitarrays_pass_through() {
        let bit_array = DecodedValue::BitArray {
            bits: 12,
            data: vec![0xAB, 0x05],
        };
        assert_eq!(normalize(bit_array.clone()), bit_array);
        assert_eq!(normalize(DecodedValue::Int(-7)), DecodedValue::Int(-7));
        assert_eq!(normalize(DecodedValue::Null), DecodedValue::Null);
    }

    #[test]
    fn normalize_is_idempotent() {
        let tree = DecodedValue::Array(vec![
            DecodedValue::Bytes(b"once".to_vec()),
            DecodedValue::Text("already text".to_owned()),
        ]);
        let once = normalize(tree);
        assert_eq!(normalize(once.clone()), once);
    }
}
