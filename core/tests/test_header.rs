// Chunk header codec: bit layout, full length range, rejection of bad input.

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use psn_core::constants::{HAS_CHILDREN_BIT, MAX_CHUNK_DATA_LEN};
    use psn_core::headers::{decode_chunk_header_le, encode_chunk_header_le, ChunkHeader, HeaderError};

// # ✅ 1. Wire layout

    #[test]
    fn root_header_word_layout() {
        let h = ChunkHeader::new(0x6755, 12, true).unwrap();
        let bytes = encode_chunk_header_le(&h).unwrap();
        assert_eq!(u32::from_le_bytes(bytes), 0x6755 | (12 << 16) | HAS_CHILDREN_BIT);
    }

    #[test]
    fn leaf_header_has_no_children_bit() {
        let h = ChunkHeader::new(3, 4, false).unwrap();
        let bytes = encode_chunk_header_le(&h).unwrap();
        assert_eq!(bytes, [0x03, 0x00, 0x04, 0x00]);
    }

    #[test]
    fn max_length_does_not_touch_children_bit() {
        let h = ChunkHeader::new(0xFFFF, MAX_CHUNK_DATA_LEN, false).unwrap();
        let back = decode_chunk_header_le(&encode_chunk_header_le(&h).unwrap()).unwrap();
        assert_eq!(back, h);
        assert!(!back.has_children);
    }

// # ✅ 2. Encode → decode roundtrip over every length

    #[test]
    fn every_length_roundtrips() {
        for len in 0..=MAX_CHUNK_DATA_LEN {
            for has_children in [false, true] {
                let h = ChunkHeader::new(0x0001, len, has_children).unwrap();
                let back = decode_chunk_header_le(&encode_chunk_header_le(&h).unwrap()).unwrap();
                assert_eq!(back, h, "len {len} children {has_children}");
            }
        }
    }

    proptest! {
        #[test]
        fn any_header_roundtrips(id in any::<u16>(), len in 0usize..=MAX_CHUNK_DATA_LEN, has_children in any::<bool>()) {
            let h = ChunkHeader::new(id, len, has_children).unwrap();
            let bytes = encode_chunk_header_le(&h).unwrap();
            prop_assert_eq!(decode_chunk_header_le(&bytes).unwrap(), h);
        }

        #[test]
        fn any_word_decodes(word in any::<u32>()) {
            let h = decode_chunk_header_le(&word.to_le_bytes()).unwrap();
            prop_assert_eq!(u32::from_le_bytes(encode_chunk_header_le(&h).unwrap()), word);
        }
    }

// # ❌ 3. Rejections

    #[test]
    fn length_over_15_bits_is_rejected() {
        let err = ChunkHeader::new(1, MAX_CHUNK_DATA_LEN + 1, false).unwrap_err();
        assert!(matches!(err, HeaderError::DataLenTooLarge { .. }));
    }

    #[test]
    fn short_buffer_is_rejected() {
        let err = decode_chunk_header_le(&[0x55, 0x67, 0x00]).unwrap_err();
        assert_eq!(err, HeaderError::BufferTooShort { have: 3, need: 4 });
    }
}
