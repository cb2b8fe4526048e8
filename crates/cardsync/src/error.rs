use thiserror::Error;

/// Why an operation only took effect on this device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotSyncedReason {
    /// The record has never been confirmed by the remote store.
    PendingCreate,
    /// The remote store could not be reached.
    Offline,
}

#[derive(Error, Debug)]
pub enum CardError {
    #[error("Remote store unavailable: {0}")]
    RemoteUnavailable(String),

    #[error("Remote store rejected the request: {0}")]
    RemoteRejected(String),

    #[error("Local storage unavailable: {0}")]
    LocalStorageUnavailable(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The local cache reflects the change but the remote store does not.
    #[error("Change to {id} was applied locally only and is not synced")]
    NotSynced { id: String, reason: NotSyncedReason },
}

impl CardError {
    /// Errors that a disconnected device is expected to produce.
    pub fn is_transient(&self) -> bool {
        matches!(self, CardError::RemoteUnavailable(_))
    }

    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            CardError::RemoteUnavailable(_) | CardError::RemoteRejected(_)
        )
    }
}

impl From<std::io::Error> for CardError {
    fn from(err: std::io::Error) -> Self {
        CardError::LocalStorageUnavailable(format!("IO error: {}", err))
    }
}

impl From<serde_json::Error> for CardError {
    fn from(err: serde_json::Error) -> Self {
        CardError::LocalStorageUnavailable(format!("Serialization error: {}", err))
    }
}

pub type Result<T> = std::result::Result<T, CardError>;
