//! Chunk codec: split an attachment's base64 data string into bounded
//! pieces and put it back together.
//!
//! The codec is deliberately dumb. It never reorders anything; the
//! transfer layer is responsible for feeding [`decode`] chunks sorted by
//! index.

/// Split `payload` into consecutive pieces of at most `chunk_size` bytes.
///
/// The last chunk may be shorter; an empty payload yields no chunks.
/// Payloads are base64 data strings (ASCII), so every chunk is normally
/// exactly `chunk_size` long; a multi-byte character at a boundary is
/// kept intact rather than split.
///
/// # Panics
///
/// Panics if `chunk_size` is zero.
pub fn encode(payload: &str, chunk_size: usize) -> Vec<String> {
    assert!(chunk_size > 0, "chunk size must be positive");

    let mut chunks = Vec::with_capacity(payload.len().div_ceil(chunk_size));
    let mut rest = payload;

    while !rest.is_empty() {
        let mut end = chunk_size.min(rest.len());
        while end > 0 && !rest.is_char_boundary(end) {
            end -= 1;
        }
        if end == 0 {
            // chunk_size is smaller than the first character; emit it whole.
            end = rest.chars().next().map_or(rest.len(), char::len_utf8);
        }

        let (head, tail) = rest.split_at(end);
        chunks.push(head.to_string());
        rest = tail;
    }

    chunks
}

/// Concatenate chunks in the given order.
pub fn decode<'a, I>(chunks: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    chunks.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip() {
        let payload = "data:image/png;base64,iVBORw0KGgoAAAANSUhEUg";
        for chunk_size in [1, 2, 7, 16, 1024] {
            let chunks = encode(payload, chunk_size);
            let rebuilt = decode(chunks.iter().map(String::as_str));
            assert_eq!(rebuilt, payload, "chunk_size {chunk_size}");
        }
    }

    #[test]
    fn splits_large_payload_into_expected_chunks() {
        let payload = "A".repeat(1_200_000);
        let chunks = encode(&payload, 500_000);

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].len(), 500_000);
        assert_eq!(chunks[1].len(), 500_000);
        assert_eq!(chunks[2].len(), 200_000);

        let rebuilt = decode(chunks.iter().map(String::as_str));
        assert_eq!(rebuilt.len(), 1_200_000);
        assert_eq!(rebuilt, payload);
    }

    #[test]
    fn empty_payload_yields_no_chunks() {
        assert!(encode("", 500_000).is_empty());
        assert_eq!(decode(std::iter::empty()), "");
    }

    #[test]
    fn keeps_multibyte_characters_intact() {
        let payload = "héllo wörld ✓".repeat(100);
        let chunks = encode(&payload, 7);
        let rebuilt = decode(chunks.iter().map(String::as_str));
        assert_eq!(rebuilt, payload);
    }
}
