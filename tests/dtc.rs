use ecu_link::{parse_dtc_response, tokenize_hex, DiagnosticTroubleCode};
use pretty_assertions::assert_eq;

fn codes(raw: &str) -> Vec<String> {
    parse_dtc_response(raw)
        .codes
        .iter()
        .map(ToString::to_string)
        .collect()
}

#[test]
fn adapter_reply_decodes() {
    assert_eq!(codes("43 01 71 00 00 00\r\n>"), vec!["P0171"]);
    assert_eq!(codes("4301330101C1\r>"), vec!["P0133", "P0101"]);
    assert_eq!(codes("43 41 23 81 00 C2 34\r>"), vec!["C0123", "B0100", "U0234"]);
}

#[test]
fn unusable_replies_are_empty() {
    for raw in ["", "NO DATA\r\r>", "?\r>", "41 00 BE 3F A8 13\r>", "43\r>"] {
        let report = parse_dtc_response(raw);
        assert!(report.is_empty(), "{:?}", raw);
        assert_eq!(report.raw, raw);
    }
}

#[test]
fn tokenizer_drops_noise() {
    assert_eq!(tokenize_hex("SEARCHING...\r41 0C 1A F8\r\r>"), vec![0x41, 0x0C, 0x1A, 0xF8]);
}

#[test]
fn text_form_parses_back() {
    let code: DiagnosticTroubleCode = "U3FFF".parse().unwrap();
    assert_eq!(code.to_bytes(), [0xFF, 0xFF]);
    assert!("P4000".parse::<DiagnosticTroubleCode>().is_err());
}
