//! KWP2000 request/response layer over an ELM327 link.
//!
//! Each service sends its request as hex text, tokenizes the reply and checks
//! the first byte against the expected positive-response signature. Nothing is
//! retried here. SecurityAccess is not modelled, so the session never leaves
//! the `Uninitialized -> SessionStarted -> Alive` track.

use log::{debug, info};

use crate::codec::{tokenize_hex, ByteFrame};
use crate::error::{Error, Result};
use crate::protocols::elm::{AdapterLink, RawResponse};
use crate::protocols::Transport;

mod types;

pub use self::types::{
    NegativeResponseCode, Service, SessionState, NEGATIVE_RESPONSE, TESTER_PRESENT_ACK,
};

/// Format byte, target ECU, tester address.
pub const DEFAULT_HEADER: &str = "81 10 F1";
pub const DEFAULT_SESSION_LEVEL: u8 = 0x81;
pub const ECU_ID_LOCAL_IDENTIFIER: u8 = 0x90;
/// Largest block ReadMemoryByAddress can request.
pub const MAX_READ_SIZE: usize = 0xFF;
const MAX_ADDRESS: u32 = 0x00FF_FFFF;

pub struct DiagnosticSession<T: Transport> {
    link: AdapterLink<T>,
    state: SessionState,
}

impl<T: Transport> DiagnosticSession<T> {
    pub fn new(link: AdapterLink<T>) -> Self {
        Self {
            link,
            state: SessionState::Uninitialized,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn link(&self) -> &AdapterLink<T> {
        &self.link
    }

    pub fn link_mut(&mut self) -> &mut AdapterLink<T> {
        &mut self.link
    }

    pub fn start_session(&mut self, level: u8) -> Result<ByteFrame> {
        let service = Service::StartDiagnosticSession;
        let (data, raw) = self.request(&format!("{:02X} {:02X}", service.id(), level))?;
        expect_signature(service, &data, &raw, &[service.positive_response()], 1)?;

        info!("Diagnostic session {:#04x} started", level);
        self.state = SessionState::SessionStarted;
        Ok(data)
    }

    /// Keep-alive. Callers are responsible for sending it periodically.
    pub fn tester_present(&mut self) -> Result<ByteFrame> {
        let service = Service::TesterPresent;
        let (data, raw) = self.request(&format!("{:02X} 00", service.id()))?;
        expect_signature(
            service,
            &data,
            &raw,
            &[service.positive_response(), TESTER_PRESENT_ACK],
            1,
        )?;

        if self.state != SessionState::Uninitialized {
            self.state = SessionState::Alive;
        }
        Ok(data)
    }

    /// Returns the identification record without the two-byte header.
    pub fn read_ecu_id(&mut self) -> Result<ByteFrame> {
        let service = Service::ReadEcuIdentification;
        let (data, raw) = self.request(&format!(
            "{:02X} {:02X}",
            service.id(),
            ECU_ID_LOCAL_IDENTIFIER
        ))?;
        expect_signature(service, &data, &raw, &[service.positive_response()], 1)?;

        Ok(data.get(2..).map(<[u8]>::to_vec).unwrap_or_default())
    }

    /// Reads `size` bytes (1..=255) at a 24-bit address and returns the payload
    /// following the four-byte response header.
    pub fn read_memory(&mut self, address: u32, size: usize) -> Result<ByteFrame> {
        if !(1..=MAX_READ_SIZE).contains(&size) {
            return Err(Error::InvalidBlockSize(size));
        }
        if address > MAX_ADDRESS {
            return Err(Error::OutOfRange {
                address,
                length: size,
                limit: MAX_ADDRESS as usize + 1,
            });
        }

        let service = Service::ReadMemoryByAddress;
        let [_, a2, a1, a0] = address.to_be_bytes();
        let (data, raw) = self.request(&format!(
            "{:02X} {:02X} {:02X} {:02X} {:02X}",
            service.id(),
            a2,
            a1,
            a0,
            size
        ))?;
        expect_signature(service, &data, &raw, &[service.positive_response()], 4)?;

        Ok(data[4..].to_vec())
    }

    /// Liveness probe: header, StartDiagnosticSession, TesterPresent. True if
    /// either service answered positively. Never fails.
    pub fn ping(&mut self, header: &str) -> bool {
        if let Err(e) = self.link.set_header(header) {
            debug!("KWP ping: set header failed: {}", e);
            return false;
        }

        let started = self
            .start_session(DEFAULT_SESSION_LEVEL)
            .map_err(|e| debug!("KWP ping: {}", e))
            .is_ok();
        let alive = self
            .tester_present()
            .map_err(|e| debug!("KWP ping: {}", e))
            .is_ok();

        started || alive
    }

    pub fn close(&mut self) {
        self.link.close();
    }

    fn request(&mut self, payload: &str) -> Result<(ByteFrame, RawResponse)> {
        let raw = self.link.send_raw(payload)?;
        Ok((tokenize_hex(raw.as_str()), raw))
    }
}

fn expect_signature(
    service: Service,
    data: &[u8],
    raw: &RawResponse,
    accepted: &[u8],
    min_len: usize,
) -> Result<()> {
    match data.first() {
        Some(first) if accepted.contains(first) && data.len() >= min_len => Ok(()),
        Some(&NEGATIVE_RESPONSE) => Err(Error::NegativeResponse {
            service: data.get(1).copied().unwrap_or(service.id()),
            code: NegativeResponseCode::from(data.get(2).copied().unwrap_or(0)),
            raw: raw.to_string(),
        }),
        _ => Err(Error::MalformedResponse {
            service: service.name(),
            raw: raw.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocols::elm::mock::ScriptedTransport;
    use crate::protocols::elm::LinkTiming;
    use pretty_assertions::assert_eq;

    fn session(adapter: &ScriptedTransport) -> DiagnosticSession<ScriptedTransport> {
        DiagnosticSession::new(AdapterLink::with_timing(
            adapter.clone(),
            LinkTiming::immediate(),
        ))
    }

    #[test]
    fn start_session_positive() {
        let adapter = ScriptedTransport::new().reply("10 81", "50 81\r\r>");
        let mut kwp = session(&adapter);

        assert_eq!(kwp.start_session(DEFAULT_SESSION_LEVEL).unwrap(), vec![0x50, 0x81]);
        assert_eq!(kwp.state(), SessionState::SessionStarted);
        assert_eq!(adapter.commands(), vec!["10 81"]);
    }

    #[test]
    fn start_session_rejects_empty_and_foreign_replies() {
        let adapter = ScriptedTransport::silent();
        let mut kwp = session(&adapter);
        let err = kwp.start_session(0x81).unwrap_err();
        assert!(matches!(
            err,
            Error::MalformedResponse { service: "StartDiagnosticSession", .. }
        ));
        assert_eq!(kwp.state(), SessionState::Uninitialized);

        let adapter = ScriptedTransport::new().reply("10 85", "51 85\r>");
        let mut kwp = session(&adapter);
        let err = kwp.start_session(0x85).unwrap_err();
        assert_eq!(err.raw_response(), Some("51 85\r>"));
    }

    #[test]
    fn negative_response_is_decoded() {
        let adapter = ScriptedTransport::new().reply("10 81", "7F 10 22\r>");
        let mut kwp = session(&adapter);

        match kwp.start_session(0x81) {
            Err(Error::NegativeResponse { service, code, raw }) => {
                assert_eq!(service, 0x10);
                assert_eq!(code, NegativeResponseCode::ConditionsNotCorrect);
                assert_eq!(raw, "7F 10 22\r>");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn tester_present_accepts_both_acks() {
        for reply in ["7E 00\r>", "C0\r>"] {
            let adapter = ScriptedTransport::new()
                .reply("10 81", "50 81\r>")
                .reply("3E 00", reply);
            let mut kwp = session(&adapter);

            kwp.start_session(0x81).unwrap();
            kwp.tester_present().unwrap();
            assert_eq!(kwp.state(), SessionState::Alive);
        }

        let adapter = ScriptedTransport::new().reply("3E 00", "NO DATA\r>");
        assert!(session(&adapter).tester_present().is_err());
    }

    #[test]
    fn tester_present_without_session_stays_uninitialized() {
        let adapter = ScriptedTransport::new().reply("3E 00", "7E\r>");
        let mut kwp = session(&adapter);

        kwp.tester_present().unwrap();
        assert_eq!(kwp.state(), SessionState::Uninitialized);
    }

    #[test]
    fn read_ecu_id_strips_header() {
        let adapter = ScriptedTransport::new().reply("1A 90", "5A 90 4A 37 32\r>");
        let mut kwp = session(&adapter);

        assert_eq!(kwp.read_ecu_id().unwrap(), b"J72".to_vec());

        let adapter = ScriptedTransport::new().reply("1A 90", "5A\r>");
        assert!(session(&adapter).read_ecu_id().unwrap().is_empty());
    }

    #[test]
    fn read_ecu_id_rejects_foreign_replies() {
        let adapter = ScriptedTransport::new().reply("1A 90", "50 81\r>");
        let err = session(&adapter).read_ecu_id().unwrap_err();
        assert!(matches!(
            err,
            Error::MalformedResponse { service: "ReadEcuIdentification", .. }
        ));
        assert_eq!(err.raw_response(), Some("50 81\r>"));

        let adapter = ScriptedTransport::silent();
        assert!(session(&adapter).read_ecu_id().is_err());

        let adapter = ScriptedTransport::new().reply("1A 90", "7F 1A 12\r>");
        assert!(matches!(
            session(&adapter).read_ecu_id(),
            Err(Error::NegativeResponse { service: 0x1A, .. })
        ));
    }

    #[test]
    fn read_memory_encodes_address_big_endian() {
        let adapter =
            ScriptedTransport::new().reply("23 01 02 03 02", "63 01 02 03 AA BB\r>");
        let mut kwp = session(&adapter);

        assert_eq!(kwp.read_memory(0x010203, 2).unwrap(), vec![0xAA, 0xBB]);
        assert_eq!(adapter.commands(), vec!["23 01 02 03 02"]);
    }

    #[test]
    fn read_memory_requires_full_header() {
        let adapter = ScriptedTransport::new().reply("23 00 00 00 01", "63 00 00\r>");
        let mut kwp = session(&adapter);

        assert!(matches!(
            kwp.read_memory(0, 1),
            Err(Error::MalformedResponse { .. })
        ));
    }

    #[test]
    fn read_memory_size_checked_before_io() {
        let adapter = ScriptedTransport::new();
        let mut kwp = session(&adapter);

        assert!(matches!(kwp.read_memory(0, 0), Err(Error::InvalidBlockSize(0))));
        assert!(matches!(kwp.read_memory(0, 256), Err(Error::InvalidBlockSize(256))));
        assert!(matches!(
            kwp.read_memory(0x0100_0000, 16),
            Err(Error::OutOfRange { .. })
        ));
        assert_eq!(adapter.bytes_written(), 0);
    }

    #[test]
    fn ping_reports_liveness() {
        let adapter = ScriptedTransport::new().reply("3E 00", "7E 00\r>");
        let mut kwp = session(&adapter);
        assert!(kwp.ping(DEFAULT_HEADER));
        assert_eq!(
            adapter.commands(),
            vec!["AT SH 81 10 F1", "10 81", "3E 00"]
        );

        let adapter = ScriptedTransport::silent();
        assert!(!session(&adapter).ping(DEFAULT_HEADER));
    }
}
