//! ECU Diagnostics and Memory Transfer Library
//!
//! This library talks to an automotive ECU through an ELM327-class AT-command
//! serial adapter.
//!
//! # Features
//! - OBD-II Mode 03 trouble code decoding
//! - KWP2000 session control, keep-alive, identification and memory reads
//! - Chunked firmware dump/flash over a common memory backend
//! - File-backed ECU simulator with CRC-32 reporting
//! - Writes to a real ECU are always refused
//!
//! # Protocol Stack
//! - Frame codec (adapter text -> bytes, trouble codes)
//! - Adapter link (AT commands over a serial port)
//! - Diagnostic session (KWP2000 services)
//! - Memory backends (simulated, live)
//!
//! # Examples
//!
//! ## Reading Trouble Codes
//! ```rust,no_run
//! use ecu_link::{AdapterLink, SerialTransport};
//! use std::time::Duration;
//!
//! fn main() -> ecu_link::Result<()> {
//!     let port = SerialTransport::open("/dev/ttyUSB0", 38400, Duration::from_secs(1))?;
//!     let mut link = AdapterLink::new(port);
//!     link.initialize()?;
//!
//!     let report = ecu_link::read_dtcs(&mut link)?;
//!     for code in &report.codes {
//!         println!("{}", code);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Simulator Round Trip
//! ```rust,no_run
//! fn main() -> ecu_link::Result<()> {
//!     let config = ecu_link::new_config().with_store("logs/sim_ecu.bin");
//!     let mut backend = config.open_simulated()?;
//!
//!     let dumped = config.dump(&mut backend, "logs/dump.bin")?;
//!     println!("{} bytes, {}", dumped.bytes_moved, dumped.backend_info);
//!
//!     config.flash(&mut backend, "logs/dump.bin")?;
//!     Ok(())
//! }
//! ```
//!
//! ## Reading a Live ECU
//! ```rust,no_run
//! fn main() -> ecu_link::Result<()> {
//!     let config = ecu_link::new_config().with_port("/dev/ttyUSB0").with_chunk_size(128);
//!     let mut backend = config.open_live()?;
//!
//!     config.dump(&mut backend, "logs/ecu.bin")?;
//!     backend.close();
//!     Ok(())
//! }
//! ```

pub mod backend;
pub mod codec;
mod config;
mod error;
pub mod firmware;
pub mod protocols;

pub use backend::{BackendInfo, LiveBackend, MemoryBackend, SimulatedBackend};
pub use codec::{parse_dtc_response, tokenize_hex, ByteFrame, DiagnosticTroubleCode, DtcReport};
pub use config::EcuConfig;
pub use error::{Error, Result};
pub use firmware::{dump, flash, Region, TransferResult, FLASH};
pub use protocols::elm::{AdapterLink, RawResponse, SerialTransport};
pub use protocols::kwp::{DiagnosticSession, SessionState};
pub use protocols::Transport;

/// Requests stored trouble codes (OBD Mode 03) and decodes the reply.
///
/// Only transport failures are errors; an unreadable reply is an empty report.
pub fn read_dtcs<T: Transport>(link: &mut AdapterLink<T>) -> Result<DtcReport> {
    let raw = link.send_obd(protocols::elm::READ_DTC_COMMAND)?;
    Ok(parse_dtc_response(raw.as_str()))
}

/// Creates a new configuration with default settings
pub fn new_config() -> EcuConfig {
    EcuConfig::new()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocols::elm::mock::ScriptedTransport;
    use crate::protocols::elm::LinkTiming;

    #[test]
    fn read_dtcs_over_link() {
        let adapter = ScriptedTransport::new().reply("03", "43 01 71 00 00 00\r\n>");
        let mut link = AdapterLink::with_timing(adapter.clone(), LinkTiming::immediate());

        let report = read_dtcs(&mut link).unwrap();
        assert_eq!(report.codes.len(), 1);
        assert_eq!(report.codes[0].to_string(), "P0171");
        assert_eq!(adapter.commands(), vec!["03"]);
    }

    #[test]
    fn read_dtcs_no_data() {
        let adapter = ScriptedTransport::new();
        let mut link = AdapterLink::with_timing(adapter, LinkTiming::immediate());

        let report = read_dtcs(&mut link).unwrap();
        assert!(report.is_empty());
        assert_eq!(report.raw, "NO DATA\r\r>");
    }
}
