use std::{collections::HashMap, sync::Arc};

use parking_lot::Mutex;

use crate::{
    disk::SharedBuffer,
    error::{KernelError, KernelResult},
    kernel::{handlers, Kernel},
};

// Core calls
pub const SYSCALL_OUTPUT: u32 = 0;
pub const SYSCALL_INPUT: u32 = 1;
pub const SYSCALL_EXEC: u32 = 2;
pub const SYSCALL_JOIN: u32 = 3;

// File system extension
pub const SYSCALL_FORMAT: u32 = 4;
pub const SYSCALL_CREATE: u32 = 5;
pub const SYSCALL_READ: u32 = 6;
pub const SYSCALL_WRITE: u32 = 7;
pub const SYSCALL_DELETE: u32 = 8;
pub const SYSCALL_READDIR: u32 = 9;
pub const SYSCALL_SHUTDOWN: u32 = 10;
pub const SYSCALL_GET_BLOCK_SIZE: u32 = 11;

/// A line of console input, filled in by the kernel.
pub type SharedText = Arc<Mutex<String>>;

/// A list of names, filled in by the kernel.
pub type SharedNames = Arc<Mutex<Vec<String>>>;

/// One syscall parameter.
///
/// The shared variants are out-parameters: the kernel writes into them and
/// the caller reads them back after the call returns.
#[derive(Debug, Clone)]
pub enum Arg {
    Int(i64),
    Text(String),
    List(Vec<String>),
    Bytes(Vec<u8>),
    Buffer(SharedBuffer),
    Line(SharedText),
    Names(SharedNames),
}

impl Arg {
    fn kind(&self) -> &'static str {
        match self {
            Self::Int(_) => "integer",
            Self::Text(_) => "text",
            Self::List(_) => "list",
            Self::Bytes(_) => "bytes",
            Self::Buffer(_) => "buffer",
            Self::Line(_) => "line",
            Self::Names(_) => "names",
        }
    }
}

/// Positional syscall arguments with typed accessors. A missing or
/// mistyped argument is a bad argument, never a crash.
#[derive(Debug, Clone, Default)]
pub struct SyscallArgs(Vec<Arg>);

impl SyscallArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn get(&self, index: usize) -> KernelResult<&Arg> {
        self.0
            .get(index)
            .ok_or_else(|| KernelError::BadArgument(format!("missing argument {index}")))
    }

    fn mismatch(index: usize, expected: &str, found: &Arg) -> KernelError {
        KernelError::BadArgument(format!(
            "argument {index}: expected {expected}, found {}",
            found.kind()
        ))
    }

    pub fn int(&self, index: usize) -> KernelResult<i64> {
        match self.get(index)? {
            Arg::Int(v) => Ok(*v),
            other => Err(Self::mismatch(index, "integer", other)),
        }
    }

    pub fn text(&self, index: usize) -> KernelResult<&str> {
        match self.get(index)? {
            Arg::Text(v) => Ok(v),
            other => Err(Self::mismatch(index, "text", other)),
        }
    }

    /// A missing list reads as empty.
    pub fn list_or_empty(&self, index: usize) -> KernelResult<&[String]> {
        match self.0.get(index) {
            None => Ok(&[]),
            Some(Arg::List(v)) => Ok(v),
            Some(other) => Err(Self::mismatch(index, "list", other)),
        }
    }

    pub fn bytes(&self, index: usize) -> KernelResult<&[u8]> {
        match self.get(index)? {
            Arg::Bytes(v) => Ok(v),
            other => Err(Self::mismatch(index, "bytes", other)),
        }
    }

    pub fn buffer(&self, index: usize) -> KernelResult<&SharedBuffer> {
        match self.get(index)? {
            Arg::Buffer(v) => Ok(v),
            other => Err(Self::mismatch(index, "buffer", other)),
        }
    }

    pub fn line(&self, index: usize) -> KernelResult<&SharedText> {
        match self.get(index)? {
            Arg::Line(v) => Ok(v),
            other => Err(Self::mismatch(index, "line", other)),
        }
    }

    pub fn names(&self, index: usize) -> KernelResult<&SharedNames> {
        match self.get(index)? {
            Arg::Names(v) => Ok(v),
            other => Err(Self::mismatch(index, "names", other)),
        }
    }
}

/// A user interrupt: call number plus arguments.
#[derive(Debug, Clone)]
pub struct Syscall {
    pub id: u32,
    pub args: SyscallArgs,
}

impl Syscall {
    pub fn new(id: u32) -> Self {
        Self {
            id,
            args: SyscallArgs::new(),
        }
    }

    pub fn arg(mut self, arg: Arg) -> Self {
        self.args.0.push(arg);
        self
    }
}

pub type SyscallHandler =
    Arc<dyn Fn(&Arc<Kernel>, &SyscallArgs) -> KernelResult<i32> + Send + Sync>;

/// Call number to handler. Fixed once the kernel is built.
#[derive(Clone, Default)]
pub struct SyscallTable {
    handlers: HashMap<u32, SyscallHandler>,
}

impl SyscallTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// OUTPUT, INPUT, EXEC and JOIN.
    pub fn core() -> Self {
        let mut table = Self::new();
        table
            .register(SYSCALL_OUTPUT, handlers::output)
            .register(SYSCALL_INPUT, handlers::input)
            .register(SYSCALL_EXEC, handlers::exec)
            .register(SYSCALL_JOIN, handlers::join);
        table
    }

    /// The core calls plus the file system.
    pub fn standard() -> Self {
        let mut table = Self::core();
        table
            .register(SYSCALL_FORMAT, handlers::format)
            .register(SYSCALL_CREATE, handlers::create)
            .register(SYSCALL_READ, handlers::read)
            .register(SYSCALL_WRITE, handlers::write)
            .register(SYSCALL_DELETE, handlers::delete)
            .register(SYSCALL_READDIR, handlers::readdir)
            .register(SYSCALL_SHUTDOWN, handlers::shutdown)
            .register(SYSCALL_GET_BLOCK_SIZE, handlers::get_block_size);
        table
    }

    /// Adds or replaces the handler for `id`.
    pub fn register<F>(&mut self, id: u32, handler: F) -> &mut Self
    where
        F: Fn(&Arc<Kernel>, &SyscallArgs) -> KernelResult<i32> + Send + Sync + 'static,
    {
        self.handlers.insert(id, Arc::new(handler));
        self
    }

    pub fn lookup(&self, id: u32) -> Option<&SyscallHandler> {
        self.handlers.get(&id)
    }

    pub fn contains(&self, id: u32) -> bool {
        self.handlers.contains_key(&id)
    }
}
