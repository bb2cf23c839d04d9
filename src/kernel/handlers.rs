//! Syscall bodies. Each one pulls its arguments by position and returns the
//! call's result or a [`KernelError`] for the dispatcher to map.

use std::sync::Arc;

use tracing::debug;

use crate::{
    error::{KernelError, KernelResult},
    fs::{self, error::FileSystemError, FileSystem},
    kernel::{syscall::SyscallArgs, Kernel},
    library::Library,
};

pub(crate) fn output(kernel: &Arc<Kernel>, args: &SyscallArgs) -> KernelResult<i32> {
    kernel.console().write(args.text(0)?)?;
    Ok(0)
}

pub(crate) fn input(kernel: &Arc<Kernel>, args: &SyscallArgs) -> KernelResult<i32> {
    let line = args.line(0)?;
    let text = kernel.console().read_line()?.ok_or(KernelError::EndOfFile)?;
    *line.lock() = text;
    Ok(0)
}

pub(crate) fn exec(kernel: &Arc<Kernel>, args: &SyscallArgs) -> KernelResult<i32> {
    let name = args.text(0)?;
    let argv = args.list_or_empty(1)?.to_vec();
    let pid = kernel
        .launcher()
        .launch(&Library::new(Arc::clone(kernel)), name, argv)?;
    Ok(pid)
}

pub(crate) fn join(kernel: &Arc<Kernel>, args: &SyscallArgs) -> KernelResult<i32> {
    let raw = args.int(0)?;
    let pid = i32::try_from(raw).map_err(|_| KernelError::NoSuchProcess(-1))?;
    kernel.launcher().join_one(pid)
}

pub(crate) fn format(kernel: &Arc<Kernel>, _args: &SyscallArgs) -> KernelResult<i32> {
    kernel.with_fs(|fs| fs.format())?;
    kernel.console().write("Kernel: Disk formatted.\n")?;
    Ok(0)
}

pub(crate) fn create(kernel: &Arc<Kernel>, args: &SyscallArgs) -> KernelResult<i32> {
    let name = args.text(0)?;
    let block = file_op(kernel, |fs| fs.create(name))?;
    kernel
        .console()
        .write(&format!("Kernel: Created file {name} at block {block}.\n"))?;
    Ok(0)
}

pub(crate) fn read(kernel: &Arc<Kernel>, args: &SyscallArgs) -> KernelResult<i32> {
    let name = args.text(0)?;
    let buffer = args.buffer(1)?;
    let n = file_op(kernel, |fs| fs.read(name, &mut buffer.lock()))?;
    Ok(n as i32)
}

pub(crate) fn write(kernel: &Arc<Kernel>, args: &SyscallArgs) -> KernelResult<i32> {
    let name = args.text(0)?;
    let data = args.bytes(1)?;
    let n = file_op(kernel, |fs| fs.write(name, data))?;
    debug!(name, bytes = n, "write syscall");
    Ok(0)
}

pub(crate) fn delete(kernel: &Arc<Kernel>, args: &SyscallArgs) -> KernelResult<i32> {
    let name = args.text(0)?;
    file_op(kernel, |fs| fs.delete(name))?;
    Ok(0)
}

pub(crate) fn readdir(kernel: &Arc<Kernel>, args: &SyscallArgs) -> KernelResult<i32> {
    let names = args.names(0)?;
    let listing = kernel.with_fs(|fs| Ok(fs.list()))?;
    *names.lock() = listing;
    Ok(0)
}

pub(crate) fn shutdown(kernel: &Arc<Kernel>, _args: &SyscallArgs) -> KernelResult<i32> {
    kernel.with_fs(|fs| fs.sync())?;
    Ok(0)
}

pub(crate) fn get_block_size(kernel: &Arc<Kernel>, _args: &SyscallArgs) -> KernelResult<i32> {
    let size = kernel.with_fs(|fs| Ok(fs.block_size()))?;
    Ok(size as i32)
}

/// A file operation whose user errors are also reported on the console.
fn file_op<T>(
    kernel: &Kernel,
    op: impl FnOnce(&mut FileSystem) -> fs::error::Result<T>,
) -> KernelResult<T> {
    kernel.with_fs(op).inspect_err(|e| {
        if let KernelError::FileSystem(e) = e {
            if let Some(message) = user_error(e) {
                // Best effort: the error code still reaches the caller.
                let _ = kernel.console().write(&message);
            }
        }
    })
}

fn user_error(e: &FileSystemError) -> Option<String> {
    let message = match e {
        FileSystemError::NotFound(_) => "File not found.".to_string(),
        FileSystemError::AlreadyExists { block, .. } => {
            format!("File name already exists at block {block}!")
        }
        FileSystemError::InvalidName(name) if name.is_empty() => "File name is empty!".to_string(),
        FileSystemError::InvalidName(_) => "File name too long!".to_string(),
        FileSystemError::DiskFull => "Disk is full!".to_string(),
        FileSystemError::Device(_) | FileSystemError::BlockTooSmall(_) => return None,
    };
    Some(format!("Kernel: User error: {message}\n"))
}
