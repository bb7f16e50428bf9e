use std::{error, fmt, io};

// -------------------------------------------------------------------------------------------------

/// Provides an enumeration of all possible errors reported by curvemod.
#[derive(Debug)]
pub enum Error {
    /// A structural edit which is never allowed: deleting the fixed first or the
    /// terminal point, inserting before the fixed first point, or dragging the
    /// fixed first point.
    InvalidOperation(String),
    /// The modulator is already linked to the given parameter.
    AlreadyLinked,
    /// The modulator has no remaining outgoing link slots.
    LinkLimitExceeded,
    /// A point id refers to a point which no longer exists.
    PointNotFound,
    /// A link id refers to a link which no longer exists.
    LinkNotFound,
    /// A modulator id outside the registry's populated range.
    ModulatorNotFound(usize),
    /// The registry's fixed modulator capacity is exhausted.
    ModulatorLimitExceeded,
    /// A state blob was written by an unknown version of the engine.
    VersionMismatch { major: i32, minor: i32, patch: i32 },
    /// A state blob is structurally invalid (bad counts, unknown enum tags).
    CorruptState(String),
    SendError(String),
    IoError(io::Error),
}

impl error::Error for Error {}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidOperation(str) => write!(f, "Invalid edit operation: {str}"),
            Self::AlreadyLinked => write!(f, "Modulator is already linked to this parameter"),
            Self::LinkLimitExceeded => write!(f, "Modulator has no free link slots"),
            Self::PointNotFound => write!(f, "Curve point no longer exists"),
            Self::LinkNotFound => write!(f, "Modulation link no longer exists"),
            Self::ModulatorNotFound(index) => {
                write!(f, "Modulator with index {index} not found")
            }
            Self::ModulatorLimitExceeded => write!(f, "Modulator capacity exhausted"),
            Self::VersionMismatch {
                major,
                minor,
                patch,
            } => {
                write!(f, "Unknown state version {major}.{minor}.{patch}")
            }
            Self::CorruptState(str) => write!(f, "Corrupt state: {str}"),
            Self::SendError(str) => write!(f, "Failed to send channel message: {str}"),
            Self::IoError(err) => err.fmt(f),
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Error {
        Error::IoError(err)
    }
}

impl<T> From<crossbeam_channel::TrySendError<T>> for Error {
    fn from(err: crossbeam_channel::TrySendError<T>) -> Self {
        Error::SendError(err.to_string())
    }
}
