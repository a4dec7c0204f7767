// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Au-Zone Technologies

use std::fmt;
use std::process::ExitCode;

/// CLI-specific error type with exit code mapping
#[derive(Debug)]
pub enum CliError {
    /// Invalid command-line arguments
    InvalidArgs(String),
    /// Display driver rejected or failed an operation
    Device(String),
    /// Pipes, source size or rotator buffers beyond the hardware limits
    ResourceExhausted(String),
    /// Stereo layout or geometry the overlay cannot express
    Unsupported(String),
    /// General error from the overlay library
    General(String),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::InvalidArgs(msg) => write!(f, "Invalid arguments: {}", msg),
            CliError::Device(msg) => write!(f, "Device error: {}", msg),
            CliError::ResourceExhausted(msg) => write!(f, "Resource exhausted: {}", msg),
            CliError::Unsupported(msg) => write!(f, "Unsupported: {}", msg),
            CliError::General(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for CliError {}

impl CliError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> ExitCode {
        ExitCode::from(self.code())
    }

    fn code(&self) -> u8 {
        match self {
            CliError::InvalidArgs(_) => 2,
            CliError::Device(_) => 3,
            CliError::ResourceExhausted(_) => 4,
            CliError::Unsupported(_) => 5,
            CliError::General(_) => 1,
        }
    }
}

/// Map overlay::Error to CliError with appropriate exit codes
impl From<overlay::Error> for CliError {
    fn from(err: overlay::Error) -> Self {
        use overlay::Error;

        match err {
            Error::Device(msg) => CliError::Device(msg),
            Error::ResourceExhausted(msg) => CliError::ResourceExhausted(msg),
            Error::InvalidGeometry(msg) => CliError::Unsupported(format!("geometry: {}", msg)),
            Error::UnsupportedLayout(msg) => CliError::Unsupported(format!("layout: {}", msg)),
            Error::InvalidArgument(msg) => CliError::InvalidArgs(msg),
            Error::NotConfigured => CliError::General("overlay is not configured".to_string()),
            Error::Io(io_err) => CliError::General(format!("I/O error: {}", io_err)),
        }
    }
}

/// Helper function to convert result to exit code
pub fn result_to_exit_code<T>(result: Result<T, CliError>) -> ExitCode {
    match result {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e);
            e.exit_code()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(CliError::InvalidArgs("test".into()).code(), 2);
        assert_eq!(CliError::Device("test".into()).code(), 3);
        assert_eq!(CliError::ResourceExhausted("test".into()).code(), 4);
        assert_eq!(CliError::Unsupported("test".into()).code(), 5);
        assert_eq!(CliError::General("test".into()).code(), 1);
        assert_eq!(
            CliError::General("test".into()).exit_code(),
            ExitCode::from(1)
        );
    }

    #[test]
    fn test_from_overlay_error() {
        let err = CliError::from(overlay::Error::UnsupportedLayout("interleaved".into()));
        assert_eq!(err.code(), 5);
        let err = CliError::from(overlay::Error::InvalidGeometry("crop".into()));
        assert_eq!(err.code(), 5);
        let err = CliError::from(overlay::Error::ResourceExhausted("pipes".into()));
        assert_eq!(err.code(), 4);
        let err = CliError::from(overlay::Error::InvalidArgument("fourcc".into()));
        assert_eq!(err.code(), 2);
    }

    #[test]
    fn test_error_display() {
        let err = CliError::Device("commit rejected".to_string());
        assert_eq!(format!("{}", err), "Device error: commit rejected");
    }
}
