//! Output decoding with legacy-encoding fallback.
//!
//! Some OS console tools emit non-UTF-8 bytes on some platforms. Text-mode
//! capture first tries strict UTF-8 and only then re-decodes with the
//! platform's legacy encoding, so well-formed UTF-8 is never touched.

use encoding_rs::Encoding;

use crate::platform;

/// Decode captured bytes as UTF-8, re-decoding with `legacy` when strict
/// UTF-8 decoding fails. Falls back to lossy UTF-8 as a last resort.
pub fn decode_with_fallback(bytes: &[u8], legacy: Option<&'static Encoding>) -> String {
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => {
            if let Some(encoding) = legacy {
                let (decoded, _, had_errors) = encoding.decode(bytes);
                if !had_errors {
                    return decoded.into_owned();
                }
            }
            String::from_utf8_lossy(bytes).into_owned()
        }
    }
}

/// Decode console output using the current platform's legacy encoding hint.
pub fn decode_console(bytes: &[u8]) -> String {
    decode_with_fallback(bytes, platform::current().legacy_encoding())
}
