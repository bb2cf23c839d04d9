use std::sync::Arc;

use parking_lot::Mutex;

use crate::{
    disk::shared_buffer,
    kernel::{
        syscall::{
            Arg, Syscall, SYSCALL_CREATE, SYSCALL_DELETE, SYSCALL_EXEC, SYSCALL_FORMAT,
            SYSCALL_GET_BLOCK_SIZE, SYSCALL_INPUT, SYSCALL_JOIN, SYSCALL_OUTPUT, SYSCALL_READ,
            SYSCALL_READDIR, SYSCALL_SHUTDOWN, SYSCALL_WRITE,
        },
        Interrupt, Kernel,
    },
};

/// The system-call handle given to every program.
///
/// Each method builds one user interrupt and returns the kernel's result:
/// a non-negative value on success, a negative error code otherwise (see
/// [`crate::error::error_message`]).
#[derive(Clone)]
pub struct Library {
    kernel: Arc<Kernel>,
}

impl Library {
    pub fn new(kernel: Arc<Kernel>) -> Self {
        Self { kernel }
    }

    pub fn kernel(&self) -> &Arc<Kernel> {
        &self.kernel
    }

    fn call(&self, call: Syscall) -> i32 {
        self.kernel.interrupt(Interrupt::User(call))
    }

    pub fn output(&self, text: impl Into<String>) -> i32 {
        self.call(Syscall::new(SYSCALL_OUTPUT).arg(Arg::Text(text.into())))
    }

    /// Reads one console line into `line`, replacing its contents.
    pub fn input(&self, line: &mut String) -> i32 {
        let slot = Arc::new(Mutex::new(String::new()));
        let rc = self.call(Syscall::new(SYSCALL_INPUT).arg(Arg::Line(Arc::clone(&slot))));
        if rc >= 0 {
            *line = std::mem::take(&mut *slot.lock());
        }
        rc
    }

    /// Starts a program in parallel with the caller. Returns its pid.
    pub fn exec<I, S>(&self, name: &str, args: I) -> i32
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let args = args.into_iter().map(Into::into).collect();
        self.call(
            Syscall::new(SYSCALL_EXEC)
                .arg(Arg::Text(name.to_string()))
                .arg(Arg::List(args)),
        )
    }

    /// Waits for a process started by [`Library::exec`] and returns its
    /// exit code.
    pub fn join(&self, pid: i32) -> i32 {
        self.call(Syscall::new(SYSCALL_JOIN).arg(Arg::Int(pid.into())))
    }

    pub fn block_size(&self) -> i32 {
        self.call(Syscall::new(SYSCALL_GET_BLOCK_SIZE))
    }

    pub fn format(&self) -> i32 {
        self.call(Syscall::new(SYSCALL_FORMAT))
    }

    pub fn create(&self, name: &str) -> i32 {
        self.call(Syscall::new(SYSCALL_CREATE).arg(Arg::Text(name.to_string())))
    }

    /// Copies the file's contents into `buf`. Returns the byte count.
    pub fn read(&self, name: &str, buf: &mut [u8]) -> i32 {
        let buffer = shared_buffer(buf.len());
        let rc = self.call(
            Syscall::new(SYSCALL_READ)
                .arg(Arg::Text(name.to_string()))
                .arg(Arg::Buffer(Arc::clone(&buffer))),
        );
        if rc >= 0 {
            buf.copy_from_slice(&buffer.lock());
        }
        rc
    }

    pub fn write(&self, name: &str, data: &[u8]) -> i32 {
        self.call(
            Syscall::new(SYSCALL_WRITE)
                .arg(Arg::Text(name.to_string()))
                .arg(Arg::Bytes(data.to_vec())),
        )
    }

    pub fn delete(&self, name: &str) -> i32 {
        self.call(Syscall::new(SYSCALL_DELETE).arg(Arg::Text(name.to_string())))
    }

    /// Fills `names` with the file names on disk, in block order.
    pub fn readdir(&self, names: &mut Vec<String>) -> i32 {
        let slot = Arc::new(Mutex::new(Vec::new()));
        let rc = self.call(Syscall::new(SYSCALL_READDIR).arg(Arg::Names(Arc::clone(&slot))));
        if rc >= 0 {
            *names = std::mem::take(&mut *slot.lock());
        }
        rc
    }

    /// Flushes the disk image.
    pub fn shutdown(&self) -> i32 {
        self.call(Syscall::new(SYSCALL_SHUTDOWN))
    }
}
