use thiserror::Error;

/// Failures surfaced by the inverter client.
///
/// Invalid responses never show up here directly: they are retried inside the
/// exchange and only surface as `MaxRetries` once the retry budget is spent.
#[derive(Error, Debug)]
pub enum InverterError {
    /// The socket itself failed (bind, connect, send, ICMP unreachable).
    #[error("no response to {operation}: {source}")]
    NoResponse {
        operation: String,
        #[source]
        source: std::io::Error,
    },

    #[error("no valid response to {operation} after {attempts} attempts")]
    MaxRetries { operation: String, attempts: u32 },

    /// A validated response whose content could not be interpreted.
    #[error("processing error: {0}")]
    Processing(String),

    #[error("unknown setting \"{0}\"")]
    UnknownSetting(String),

    #[error("setting \"{0}\" is not writable")]
    ReadOnlySetting(String),

    #[error("invalid value for {id}: {reason}")]
    InvalidValue { id: String, reason: String },

    #[error("{0} is not supported by this inverter family")]
    Unsupported(String),

    #[error("unable to detect a supported inverter at {target}: {}", describe(.failures))]
    NotDetected {
        target: String,
        failures: Vec<(&'static str, InverterError)>,
    },
}

impl InverterError {
    /// Errors raised before any datagram was sent.
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            Self::UnknownSetting(_)
                | Self::ReadOnlySetting(_)
                | Self::InvalidValue { .. }
                | Self::Unsupported(_)
        )
    }

    /// Errors meaning the device never produced a usable answer.
    pub fn is_unreachable(&self) -> bool {
        matches!(self, Self::NoResponse { .. } | Self::MaxRetries { .. })
    }
}

fn describe(failures: &[(&'static str, InverterError)]) -> String {
    failures
        .iter()
        .map(|(family, err)| format!("{}: {}", family, err))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Per-field decode and encode failures.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CodecError {
    #[error("{width} bytes at offset {offset} exceed buffer of {len} bytes")]
    OutOfBounds {
        offset: usize,
        width: usize,
        len: usize,
    },

    #[error("invalid timestamp {0:?}")]
    InvalidTimestamp([u8; 6]),

    #[error("value {value} cannot be encoded as {codec}")]
    Unencodable { value: String, codec: &'static str },
}
