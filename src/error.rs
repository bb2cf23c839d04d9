use std::io;

use thiserror::Error;

use crate::{fs::error::FileSystemError, kernel::launcher::LaunchError};

/// Numeric results returned across the syscall boundary.
///
/// Zero means success, non-negative values are data (a pid, a byte count),
/// and the negative values below are errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum ErrorCode {
    BadArgument = -1,
    NoClass = -2,
    NoMain = -3,
    BadCommand = -4,
    OutOfRange = -5,
    EndOfFile = -6,
    Io = -7,
    InChild = -8,
    NoSuchProcess = -9,
}

impl ErrorCode {
    pub const ALL: [ErrorCode; 9] = [
        Self::BadArgument,
        Self::NoClass,
        Self::NoMain,
        Self::BadCommand,
        Self::OutOfRange,
        Self::EndOfFile,
        Self::Io,
        Self::InChild,
        Self::NoSuchProcess,
    ];

    pub const fn code(self) -> i32 {
        self as i32
    }

    pub fn from_code(rc: i32) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.code() == rc)
    }

    pub const fn message(self) -> &'static str {
        match self {
            Self::BadArgument => "Invalid argument",
            Self::NoClass => "No such class",
            Self::NoMain => "Class has no main method",
            Self::BadCommand => "Command aborted",
            Self::OutOfRange => "Argument out of range",
            Self::EndOfFile => "End of file on console input",
            Self::Io => "I/O error on console input",
            Self::InChild => "Exception in user program",
            Self::NoSuchProcess => "No such process",
        }
    }
}

/// Human readable text for a syscall result.
pub fn error_message(rc: i32) -> &'static str {
    if rc >= 0 {
        return "OK";
    }
    ErrorCode::from_code(rc).map_or("Unknown error", ErrorCode::message)
}

/// Recoverable failures of a syscall. Each one maps onto an [`ErrorCode`];
/// none of them stops the caller.
#[derive(Debug, Error)]
pub enum KernelError {
    #[error("bad argument: {0}")]
    BadArgument(String),

    #[error("unknown system call {0}")]
    UnknownSyscall(u32),

    #[error(transparent)]
    Launch(#[from] LaunchError),

    #[error("argument out of range: {0}")]
    OutOfRange(String),

    #[error("end of file on console input")]
    EndOfFile,

    #[error("console I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("no such process {0}")]
    NoSuchProcess(i32),

    #[error(transparent)]
    FileSystem(#[from] FileSystemError),

    #[error("kernel has not been powered on")]
    NotPoweredOn,

    #[error("kernel is already powered on")]
    AlreadyPoweredOn,
}

impl KernelError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::BadArgument(_)
            | Self::UnknownSyscall(_)
            | Self::NotPoweredOn
            | Self::AlreadyPoweredOn => ErrorCode::BadArgument,
            Self::Launch(e) => e.code(),
            Self::OutOfRange(_) => ErrorCode::OutOfRange,
            Self::EndOfFile => ErrorCode::EndOfFile,
            Self::Io(_) => ErrorCode::Io,
            Self::NoSuchProcess(_) => ErrorCode::NoSuchProcess,
            Self::FileSystem(e) => e.code(),
        }
    }
}

pub type KernelResult<T> = std::result::Result<T, KernelError>;
