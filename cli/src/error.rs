use std::{fmt::Display, io};

use usbprog::UpdateError;

pub enum CliError {
    IO(io::Error),
    Update(UpdateError),
    NoDevice,
    ManyDevices(usize),
}

impl From<io::Error> for CliError {
    fn from(value: io::Error) -> Self {
        CliError::IO(value)
    }
}

impl From<UpdateError> for CliError {
    fn from(value: UpdateError) -> Self {
        CliError::Update(value)
    }
}

impl Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::IO(err) => write!(f, "IO error: {err}"),
            CliError::Update(err) => write!(f, "Update error: {err}"),
            CliError::NoDevice => write!(f, "No programmable device found"),
            CliError::ManyDevices(count) => {
                write!(
                    f,
                    "{count} devices found, select one with --device"
                )
            }
        }
    }
}
