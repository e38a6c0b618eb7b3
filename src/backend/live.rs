use log::{info, warn};

use super::{BackendInfo, MemoryBackend};
use crate::error::{Error, Result};
use crate::protocols::elm::AdapterLink;
use crate::protocols::kwp::{DiagnosticSession, DEFAULT_HEADER, DEFAULT_SESSION_LEVEL};
use crate::protocols::Transport;

/// Real ECU reached through an ELM327 adapter over KWP2000.
///
/// Reads go out as ReadMemoryByAddress. Writes never reach the ECU: without
/// `developer_mode` they are refused, and with it they are still unsupported.
pub struct LiveBackend<T: Transport> {
    session: DiagnosticSession<T>,
    developer_mode: bool,
    adapter: String,
}

impl<T: Transport> LiveBackend<T> {
    pub fn new(link: AdapterLink<T>, developer_mode: bool) -> Self {
        Self::with_options(link, developer_mode, DEFAULT_HEADER, DEFAULT_SESSION_LEVEL)
    }

    /// Construction always succeeds. Adapter init, header and session start
    /// are attempted once; failures are logged and surface later as errors
    /// from the operations themselves.
    pub fn with_options(
        link: AdapterLink<T>,
        developer_mode: bool,
        header: &str,
        session_level: u8,
    ) -> Self {
        let adapter = link.name();
        let mut session = DiagnosticSession::new(link);

        let probe = (|| -> Result<()> {
            session.link_mut().initialize()?;
            session.link_mut().set_header(header)?;
            session.start_session(session_level)?;
            Ok(())
        })();
        match probe {
            Ok(()) => info!("Connected to ECU via {}", adapter),
            Err(e) => warn!("ECU probe via {} failed: {}", adapter, e),
        }

        Self {
            session,
            developer_mode,
            adapter,
        }
    }

    pub fn developer_mode(&self) -> bool {
        self.developer_mode
    }

    pub fn session(&mut self) -> &mut DiagnosticSession<T> {
        &mut self.session
    }

    /// Releases the adapter link. Never fails; repeated calls are no-ops.
    pub fn close(&mut self) {
        self.session.close();
    }
}

impl<T: Transport> MemoryBackend for LiveBackend<T> {
    fn read_block(&mut self, address: u32, size: usize) -> Result<Vec<u8>> {
        self.session.read_memory(address, size)
    }

    fn write_block(&mut self, address: u32, data: &[u8]) -> Result<()> {
        if !self.developer_mode {
            warn!(
                "Refused write of {} bytes at {:#06x}: developer mode is off",
                data.len(),
                address
            );
            return Err(Error::PermissionDenied);
        }
        Err(Error::NotImplemented("WriteMemoryByAddress on a live ECU"))
    }

    fn info(&mut self) -> Result<BackendInfo> {
        Ok(BackendInfo::Live {
            protocol: "kwp2000",
            warning: "write disabled",
            adapter: self.adapter.clone(),
        })
    }
}
