//! Stateless decoding of ELM327 response text.
//!
//! Adapter output is noisy by nature: echoed commands, banners, prompts and
//! half-received lines all show up in normal operation. Nothing in here returns
//! an error; text that cannot be decoded yields an empty result instead.

mod dtc;

pub use self::dtc::{DiagnosticTroubleCode, DtcSystem, ParseDtcError};

use serde::Serialize;

/// Ordered bytes recovered from one adapter response.
pub type ByteFrame = Vec<u8>;

/// Mode 03 positive response service ID as it appears in the text stream.
const MODE03_RESPONSE: &str = "43";
const PADDING_GROUP: &[u8] = b"0000";

/// Outcome of decoding a Mode 03 response.
///
/// `raw` is always the untouched input so callers can log it whether or not
/// any codes were found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DtcReport {
    pub codes: Vec<DiagnosticTroubleCode>,
    pub raw: String,
}

impl DtcReport {
    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}

/// Splits adapter text into bytes, keeping only two-character hex tokens.
pub fn tokenize_hex(resp: &str) -> ByteFrame {
    resp.replace(['\r', '\n', '>'], " ")
        .split_whitespace()
        .filter(|token| token.len() == 2 && token.bytes().all(|b| b.is_ascii_hexdigit()))
        .filter_map(|token| u8::from_str_radix(token, 16).ok())
        .collect()
}

/// Decodes the trouble codes carried by an OBD Mode 03 response.
///
/// A missing `43` marker and an undecodable payload both produce an empty
/// report; the two cases are indistinguishable to the caller.
pub fn parse_dtc_response(raw: &str) -> DtcReport {
    let codes = decode_mode03(raw).unwrap_or_default();
    DtcReport {
        codes,
        raw: raw.to_string(),
    }
}

fn decode_mode03(raw: &str) -> Option<Vec<DiagnosticTroubleCode>> {
    let data: String = raw
        .replace('\r', "\n")
        .split('\n')
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter(|line| !line.starts_with("AT") && !line.contains("ELM"))
        .collect::<String>()
        .replace(' ', "")
        .to_uppercase();

    let start = data.find(MODE03_RESPONSE)? + MODE03_RESPONSE.len();
    let payload = data.as_bytes().get(start..)?;

    let mut codes = Vec::new();
    for group in payload.chunks(4) {
        if group.len() < 4 || group == PADDING_GROUP {
            continue;
        }
        let text = std::str::from_utf8(group).ok()?;
        let b1 = u8::from_str_radix(text.get(0..2)?, 16).ok()?;
        let b2 = u8::from_str_radix(text.get(2..4)?, 16).ok()?;
        codes.push(DiagnosticTroubleCode::from_bytes(b1, b2));
    }
    Some(codes)
}
