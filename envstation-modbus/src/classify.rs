//! Failure classification for unsuccessful reads.

use crate::transport::TransportError;

/// Fault state a transport leaves behind after a failed transaction.
///
/// Flags stay set until a classifier consults and clears them.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FaultFlags {
    /// The last request got no response within the read timeout.
    pub timed_out: bool,
    /// Exception code from the last exception response, 0 when none.
    pub exception_code: u8,
}

impl FaultFlags {
    /// Raise the flag matching a transport error.
    pub fn record(&mut self, error: &TransportError) {
        match error {
            TransportError::Timeout => self.timed_out = true,
            TransportError::Exception { code } => self.exception_code = *code,
            TransportError::Io(_) => {}
        }
    }
}

/// Diagnostic category of a failed read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultCategory {
    Timeout,
    IllegalFunction,
    IllegalDataAddress,
    IllegalDataValue,
    ServerDeviceFailure,
    UnknownException(u8),
    Unclassified,
}

impl FaultCategory {
    /// Map a nonzero Modbus exception code.
    pub fn from_exception(code: u8) -> Self {
        match code {
            1 => FaultCategory::IllegalFunction,
            2 => FaultCategory::IllegalDataAddress,
            3 => FaultCategory::IllegalDataValue,
            4 => FaultCategory::ServerDeviceFailure,
            other => FaultCategory::UnknownException(other),
        }
    }

    /// Exception code carried by this category, if any.
    pub fn exception_code(&self) -> Option<u8> {
        match self {
            FaultCategory::IllegalFunction => Some(1),
            FaultCategory::IllegalDataAddress => Some(2),
            FaultCategory::IllegalDataValue => Some(3),
            FaultCategory::ServerDeviceFailure => Some(4),
            FaultCategory::UnknownException(code) => Some(*code),
            FaultCategory::Timeout | FaultCategory::Unclassified => None,
        }
    }
}

impl std::fmt::Display for FaultCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FaultCategory::Timeout => write!(f, "Connection timed out"),
            FaultCategory::IllegalFunction => write!(f, "Illegal function"),
            FaultCategory::IllegalDataAddress => write!(f, "Illegal data address"),
            FaultCategory::IllegalDataValue => write!(f, "Illegal data value"),
            FaultCategory::ServerDeviceFailure => write!(f, "Server device failure"),
            FaultCategory::UnknownException(code) => write!(f, "Exception response {}", code),
            FaultCategory::Unclassified => write!(f, "An error occurred"),
        }
    }
}

/// Classify the transport's post-failure state.
///
/// The timeout flag takes precedence over any exception code. Only the flag
/// that decided the category is cleared.
pub fn classify(flags: &mut FaultFlags) -> FaultCategory {
    if flags.timed_out {
        flags.timed_out = false;
        return FaultCategory::Timeout;
    }

    if flags.exception_code != 0 {
        let category = FaultCategory::from_exception(flags.exception_code);
        flags.exception_code = 0;
        return category;
    }

    FaultCategory::Unclassified
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_wins_over_exception() {
        let mut flags = FaultFlags {
            timed_out: true,
            exception_code: 2,
        };

        assert_eq!(classify(&mut flags), FaultCategory::Timeout);
        assert!(!flags.timed_out);
        // The exception flag was not consulted and survives.
        assert_eq!(flags.exception_code, 2);
        assert_eq!(classify(&mut flags), FaultCategory::IllegalDataAddress);
        assert_eq!(flags, FaultFlags::default());
    }

    #[test]
    fn test_exception_codes() {
        let cases = [
            (1, FaultCategory::IllegalFunction),
            (2, FaultCategory::IllegalDataAddress),
            (3, FaultCategory::IllegalDataValue),
            (4, FaultCategory::ServerDeviceFailure),
            (6, FaultCategory::UnknownException(6)),
            (0x0B, FaultCategory::UnknownException(0x0B)),
        ];

        for (code, expected) in cases {
            let mut flags = FaultFlags {
                timed_out: false,
                exception_code: code,
            };
            assert_eq!(classify(&mut flags), expected);
            assert_eq!(flags.exception_code, 0);
            assert_eq!(expected.exception_code(), Some(code));
        }
    }

    #[test]
    fn test_clean_state_is_unclassified() {
        let mut flags = FaultFlags::default();
        assert_eq!(classify(&mut flags), FaultCategory::Unclassified);
        assert_eq!(FaultCategory::Unclassified.to_string(), "An error occurred");
    }

    #[test]
    fn test_record_from_errors() {
        let mut flags = FaultFlags::default();
        flags.record(&TransportError::Io("crc mismatch".to_string()));
        assert_eq!(flags, FaultFlags::default());

        flags.record(&TransportError::Exception { code: 3 });
        flags.record(&TransportError::Timeout);
        assert!(flags.timed_out);
        assert_eq!(flags.exception_code, 3);
    }
}
