use std::error::Error;
use std::fmt;
use std::io;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoreErrorCode {
    Io,
    UnexpectedEof,
    SlotOutOfRange,
    InvalidValue,
    Config,
    UnrecognizedFile,
    BackupMissing,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreError {
    pub code: CoreErrorCode,
    pub message: String,
}

impl CoreError {
    pub fn new(code: CoreErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn io(context: impl fmt::Display, err: io::Error) -> Self {
        let code = if err.kind() == io::ErrorKind::UnexpectedEof {
            CoreErrorCode::UnexpectedEof
        } else {
            CoreErrorCode::Io
        };
        Self::new(code, format!("{context}: {err}"))
    }

    pub fn slot_out_of_range(what: &str, slot: usize, count: usize) -> Self {
        Self::new(
            CoreErrorCode::SlotOutOfRange,
            format!("{what} slot {slot} out of range (0-{})", count.saturating_sub(1)),
        )
    }
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.code, self.message)
    }
}

impl Error for CoreError {}

pub type Result<T> = std::result::Result<T, CoreError>;
