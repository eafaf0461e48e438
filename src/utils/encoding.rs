use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use log::error;

/// Encodes raw bytes with the standard base64 alphabet, padded.
pub fn encode(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Decodes base64 image data returned by the worker.
///
/// Accepts an optional `data:<mime>;base64,` prefix and missing trailing
/// padding. Malformed input is logged and yields `None`; callers treat that
/// as "skip this item".
pub fn safe_decode(data: &str) -> Option<Vec<u8>> {
    let mut payload = data;

    if payload.starts_with("data:") {
        match payload.split_once(',') {
            Some((_, rest)) => payload = rest,
            None => {
                error!("Base64 decoding error: data URL has no ',' separator");
                return None;
            }
        }
    }

    let mut padded = payload.to_string();
    let missing_padding = padded.len() % 4;
    if missing_padding != 0 {
        padded.push_str(&"=".repeat(4 - missing_padding));
    }

    match STANDARD.decode(padded.as_bytes()) {
        Ok(bytes) => Some(bytes),
        Err(e) => {
            error!("Base64 decoding error: {}", e);
            None
        }
    }
}
