//! A small simulated kernel: a block device with slow and fast models, a
//! single interrupt entry point, a process launcher and a flat file system
//! on top of them.

pub mod config;
pub mod disk;
pub mod error;
pub mod fs;
pub mod kernel;
pub mod library;
pub mod programs;
pub mod shell;
pub mod utils;

pub use config::BootConfig;
pub use error::{error_message, ErrorCode, KernelError};
pub use kernel::{Interrupt, Kernel, PowerOn};
pub use library::Library;
