//! PlantUML payload encoding
//!
//! The server expects diagram text embedded in the request path: the text is
//! zlib-compressed, the 2-byte zlib header and 4-byte Adler-32 trailer are cut
//! off, and the remaining raw deflate stream is written with the URL-safe
//! base64 alphabet.
//!
//! ```
//! use pumlgen_diagrams::{decode_payload, encode_payload};
//!
//! let payload = encode_payload("@startuml\nAlice -> Bob\n@enduml\n")?;
//! assert_eq!(decode_payload(payload.as_str())?, "@startuml\nAlice -> Bob\n@enduml\n");
//! # Ok::<(), pumlgen_diagrams::DiagramError>(())
//! ```

use std::fmt;
use std::io::{Read, Write};

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig, URL_SAFE};
use base64::engine::DecodePaddingMode;
use base64::Engine;
use flate2::read::DeflateDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;

use crate::error::{DiagramError, Result};

/// Length of the zlib container header
const ZLIB_HEADER_LEN: usize = 2;

/// Length of the zlib Adler-32 trailer
const ZLIB_TRAILER_LEN: usize = 4;

/// Decoder that accepts tokens with or without trailing padding
const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// URL-safe token carrying one compressed diagram source
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EncodedPayload(String);

impl EncodedPayload {
    /// Borrow the token text
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume the payload, returning the token text
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for EncodedPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Encode diagram text for use in a server URL
pub fn encode_payload(text: &str) -> Result<EncodedPayload> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(text.as_bytes())
        .map_err(|e| DiagramError::Encoding(e.to_string()))?;
    let zlibbed = encoder
        .finish()
        .map_err(|e| DiagramError::Encoding(e.to_string()))?;

    if zlibbed.len() < ZLIB_HEADER_LEN + ZLIB_TRAILER_LEN {
        return Err(DiagramError::Encoding(format!(
            "zlib stream too short ({} bytes)",
            zlibbed.len()
        )));
    }
    let deflate = &zlibbed[ZLIB_HEADER_LEN..zlibbed.len() - ZLIB_TRAILER_LEN];

    Ok(EncodedPayload(URL_SAFE.encode(deflate)))
}

/// Decode a token produced by [`encode_payload`] back into diagram text
///
/// This mirrors what the server does: URL-safe base64 decode, then inflate
/// the raw deflate stream.
pub fn decode_payload(token: &str) -> Result<String> {
    let deflate = URL_SAFE_LENIENT
        .decode(token.trim())
        .map_err(|e| DiagramError::InvalidPayload(e.to_string()))?;

    let mut text = String::new();
    DeflateDecoder::new(deflate.as_slice())
        .read_to_string(&mut text)
        .map_err(|e| DiagramError::InvalidPayload(e.to_string()))?;

    Ok(text)
}
