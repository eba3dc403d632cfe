#[derive(Debug)]
pub enum UpdateError {
    /// Failure reported by the USB transport layer (enumeration, open,
    /// configuration, claim, control or bulk transfer, reset).
    Io(String),
    /// An operation requiring an open device session was called while closed.
    NotOpened,
    /// `close` was called on an already closed session.
    AlreadyClosed,
    /// No device with the given number exists in the current discovery list.
    NoSuchDevice(usize),
}

impl std::error::Error for UpdateError {}

impl std::fmt::Display for UpdateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UpdateError::Io(cause) => write!(f, "USB error: {cause}"),
            UpdateError::NotOpened => write!(f, "Device not opened"),
            UpdateError::AlreadyClosed => write!(f, "Device already closed"),
            UpdateError::NoSuchDevice(number) => {
                write!(f, "Device {number} does not exist")
            }
        }
    }
}

impl From<nusb::Error> for UpdateError {
    fn from(err: nusb::Error) -> Self {
        UpdateError::Io(err.to_string())
    }
}

impl From<nusb::transfer::TransferError> for UpdateError {
    fn from(err: nusb::transfer::TransferError) -> Self {
        UpdateError::Io(err.to_string())
    }
}
