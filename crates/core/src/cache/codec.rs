//! Chunked base64 codec for the derived cache representation.
//!
//! Encoding walks the input in fixed-size chunks instead of handing the
//! whole buffer to the engine at once. The chunk size is kept a multiple of
//! 3 so no chunk but the last produces padding, which makes the output
//! identical to a single bulk encode. Decoding walks the text in the
//! matching 4-character multiple.

use base64::{Engine as _, engine::general_purpose::STANDARD};

use crate::Error;

/// Default encode chunk (bytes). Multiple of 3.
pub const DEFAULT_CHUNK_SIZE: usize = 32_766;

/// Binary to text codec for cached documents.
#[derive(Debug, Clone, Copy)]
pub struct ByteCodec {
    chunk_size: usize,
}

impl Default for ByteCodec {
    fn default() -> Self {
        Self { chunk_size: DEFAULT_CHUNK_SIZE }
    }
}

impl ByteCodec {
    /// Create a codec with the given chunk size.
    ///
    /// The size is rounded down to a multiple of 3 (minimum 3).
    pub fn new(chunk_size: usize) -> Self {
        let chunk_size = (chunk_size / 3 * 3).max(3);
        Self { chunk_size }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Encode bytes to standard padded base64.
    pub fn encode(&self, bytes: &[u8]) -> String {
        let mut out = String::with_capacity(base64::encoded_len(bytes.len(), true).unwrap_or_default());
        for chunk in bytes.chunks(self.chunk_size) {
            STANDARD.encode_string(chunk, &mut out);
        }
        out
    }

    /// Decode text produced by [`ByteCodec::encode`].
    pub fn decode(&self, text: &str) -> Result<Vec<u8>, Error> {
        let mut out = Vec::with_capacity(text.len() / 4 * 3);
        for chunk in text.as_bytes().chunks(self.chunk_size / 3 * 4) {
            STANDARD
                .decode_vec(chunk, &mut out)
                .map_err(|e| Error::Decode(e.to_string()))?;
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i * 31 % 251) as u8).collect()
    }

    #[test]
    fn test_round_trip_empty() {
        let codec = ByteCodec::default();
        assert_eq!(codec.encode(&[]), "");
        assert!(codec.decode("").unwrap().is_empty());
    }

    #[test]
    fn test_round_trip_single_byte() {
        let codec = ByteCodec::default();
        let encoded = codec.encode(&[0xff]);
        assert_eq!(encoded, "/w==");
        assert_eq!(codec.decode(&encoded).unwrap(), vec![0xff]);
    }

    #[test]
    fn test_round_trip_large_buffer() {
        let codec = ByteCodec::default();
        let data = sample(1024 * 1024 + 17);
        let encoded = codec.encode(&data);
        assert_eq!(codec.decode(&encoded).unwrap(), data);
    }

    #[test]
    fn test_chunked_matches_bulk_encode() {
        let codec = ByteCodec::new(9);
        let data = sample(100);
        assert_eq!(codec.encode(&data), STANDARD.encode(&data));
        assert_eq!(codec.decode(&STANDARD.encode(&data)).unwrap(), data);
    }

    #[test]
    fn test_chunk_size_rounded_to_multiple_of_three() {
        assert_eq!(ByteCodec::new(10).chunk_size(), 9);
        assert_eq!(ByteCodec::new(0).chunk_size(), 3);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        let codec = ByteCodec::default();
        assert!(matches!(codec.decode("@@@@"), Err(Error::Decode(_))));
    }
}
