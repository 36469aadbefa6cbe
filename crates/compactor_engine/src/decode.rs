use chardetng::EncodingDetector;
use encoding_rs::{Encoding, UTF_8};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedText {
    pub text: String,
    pub encoding: &'static Encoding,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("failed to decode bytes with {encoding}")]
    DecodeFailure { encoding: String },
    #[error("text cannot be represented in {encoding}")]
    EncodeFailure { encoding: String },
}

/// Decode raw bytes using: BOM -> declared type charset -> chardetng fallback.
pub fn decode_text(bytes: &[u8], declared_type: &str) -> Result<DecodedText, DecodeError> {
    if let Some((encoding, _)) = Encoding::for_bom(bytes) {
        return decode_with(bytes, encoding);
    }

    if let Some(label) = extract_charset(declared_type) {
        if let Some(enc) = Encoding::for_label(label.as_bytes()) {
            return decode_with(bytes, enc);
        }
    }

    let mut detector = EncodingDetector::new();
    detector.feed(bytes, true);
    let enc = detector.guess(None, true);
    decode_with(bytes, enc)
}

/// Encode text back into the encoding it was decoded from. UTF-16 inputs come
/// back as UTF-8, which is the only form `encoding_rs` writes for them.
pub fn encode_text(text: &str, encoding: &'static Encoding) -> Result<Vec<u8>, DecodeError> {
    if encoding == UTF_8 {
        return Ok(text.as_bytes().to_vec());
    }
    let (bytes, used, had_errors) = encoding.encode(text);
    if had_errors {
        return Err(DecodeError::EncodeFailure {
            encoding: used.name().to_string(),
        });
    }
    Ok(bytes.into_owned())
}

fn extract_charset(declared_type: &str) -> Option<String> {
    declared_type
        .split(';')
        .filter_map(|part| {
            let (key, value) = part.split_once('=')?;
            key.trim()
                .eq_ignore_ascii_case("charset")
                .then(|| value.trim_matches([' ', '"', '\''].as_ref()).to_string())
        })
        .next()
}

fn decode_with(bytes: &[u8], enc: &'static Encoding) -> Result<DecodedText, DecodeError> {
    let (text, used, had_errors) = enc.decode(bytes);
    if had_errors {
        return Err(DecodeError::DecodeFailure {
            encoding: used.name().to_string(),
        });
    }
    Ok(DecodedText {
        text: text.into_owned(),
        encoding: used,
    })
}
