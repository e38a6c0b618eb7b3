use std::fmt;

/// Service identifiers used by this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Service {
    StartDiagnosticSession = 0x10,
    ReadEcuIdentification = 0x1A,
    ReadMemoryByAddress = 0x23,
    TesterPresent = 0x3E,
}

impl Service {
    pub fn id(self) -> u8 {
        self as u8
    }

    /// Service ID + 0x40.
    pub fn positive_response(self) -> u8 {
        self.id() + 0x40
    }

    pub fn name(self) -> &'static str {
        match self {
            Service::StartDiagnosticSession => "StartDiagnosticSession",
            Service::ReadEcuIdentification => "ReadEcuIdentification",
            Service::ReadMemoryByAddress => "ReadMemoryByAddress",
            Service::TesterPresent => "TesterPresent",
        }
    }
}

/// First byte of a negative response.
pub const NEGATIVE_RESPONSE: u8 = 0x7F;

/// Some adapters acknowledge TesterPresent with this byte instead of 0x7E.
pub const TESTER_PRESENT_ACK: u8 = 0xC0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Uninitialized,
    SessionStarted,
    Alive,
}

/// KWP2000 negative response codes (ISO 14230-3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NegativeResponseCode {
    GeneralReject,
    ServiceNotSupported,
    SubFunctionNotSupported,
    BusyRepeatRequest,
    ConditionsNotCorrect,
    RoutineNotComplete,
    RequestOutOfRange,
    SecurityAccessDenied,
    InvalidKey,
    ExceededNumberOfAttempts,
    RequiredTimeDelayNotExpired,
    DownloadNotAccepted,
    UploadNotAccepted,
    GeneralProgrammingFailure,
    ResponsePending,
    ServiceNotSupportedInActiveSession,
    Unknown(u8),
}

impl From<u8> for NegativeResponseCode {
    fn from(value: u8) -> Self {
        match value {
            0x10 => Self::GeneralReject,
            0x11 => Self::ServiceNotSupported,
            0x12 => Self::SubFunctionNotSupported,
            0x21 => Self::BusyRepeatRequest,
            0x22 => Self::ConditionsNotCorrect,
            0x23 => Self::RoutineNotComplete,
            0x31 => Self::RequestOutOfRange,
            0x33 => Self::SecurityAccessDenied,
            0x35 => Self::InvalidKey,
            0x36 => Self::ExceededNumberOfAttempts,
            0x37 => Self::RequiredTimeDelayNotExpired,
            0x40 => Self::DownloadNotAccepted,
            0x50 => Self::UploadNotAccepted,
            0x72 => Self::GeneralProgrammingFailure,
            0x78 => Self::ResponsePending,
            0x80 => Self::ServiceNotSupportedInActiveSession,
            other => Self::Unknown(other),
        }
    }
}

impl fmt::Display for NegativeResponseCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::GeneralReject => "general reject",
            Self::ServiceNotSupported => "service not supported",
            Self::SubFunctionNotSupported => "sub-function not supported",
            Self::BusyRepeatRequest => "busy, repeat request",
            Self::ConditionsNotCorrect => "conditions not correct",
            Self::RoutineNotComplete => "routine not complete",
            Self::RequestOutOfRange => "request out of range",
            Self::SecurityAccessDenied => "security access denied",
            Self::InvalidKey => "invalid key",
            Self::ExceededNumberOfAttempts => "exceeded number of attempts",
            Self::RequiredTimeDelayNotExpired => "required time delay not expired",
            Self::DownloadNotAccepted => "download not accepted",
            Self::UploadNotAccepted => "upload not accepted",
            Self::GeneralProgrammingFailure => "general programming failure",
            Self::ResponsePending => "response pending",
            Self::ServiceNotSupportedInActiveSession => {
                "service not supported in active session"
            }
            Self::Unknown(code) => return write!(f, "unknown code {:#04x}", code),
        };
        f.write_str(text)
    }
}
