use std::{
    panic::{self, AssertUnwindSafe},
    process,
    sync::{Arc, OnceLock, Weak},
};

use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

use crate::{
    disk::{BlockDevice, DiskFault, DiskHandle},
    error::{ErrorCode, KernelError, KernelResult},
    fs::{self, error::FileSystemError, FileSystem},
    library::Library,
    utils::panic_message,
};

pub mod console;
pub mod disk_io;
mod handlers;
pub mod launcher;
pub mod program;
pub mod syscall;

use console::Console;
use disk_io::{CompletionLatch, InterruptDrivenDisk};
use launcher::Launcher;
use program::ProgramRegistry;
use syscall::{Syscall, SyscallTable};

/// Everything that can enter the kernel.
#[derive(Clone)]
pub enum Interrupt {
    /// A program asks for a service.
    User(Syscall),
    /// The slow disk finished its current request.
    DiskComplete,
    /// The machine was switched on.
    PowerOn(PowerOn),
}

/// Boot parameters carried by the power-on interrupt.
#[derive(Clone)]
pub struct PowerOn {
    pub cache_size: usize,
    pub disk: DiskHandle,
    /// Initial program name followed by its arguments, space separated.
    pub shell_command: String,
}

/// State bound at power-on.
struct Machine {
    cache_size: usize,
    disk: DiskHandle,
    fs: Mutex<FileSystem>,
}

/// The kernel context. Built once by boot and shared by every process.
pub struct Kernel {
    console: Arc<dyn Console>,
    launcher: Launcher,
    syscalls: SyscallTable,
    machine: OnceLock<Machine>,
    completions: Arc<CompletionLatch>,
}

impl Kernel {
    pub fn new(console: Arc<dyn Console>, programs: ProgramRegistry) -> Arc<Self> {
        Self::with_syscalls(console, programs, SyscallTable::standard())
    }

    pub fn with_syscalls(
        console: Arc<dyn Console>,
        programs: ProgramRegistry,
        syscalls: SyscallTable,
    ) -> Arc<Self> {
        Arc::new(Self {
            console,
            launcher: Launcher::new(programs),
            syscalls,
            machine: OnceLock::new(),
            completions: Arc::new(CompletionLatch::new()),
        })
    }

    pub fn console(&self) -> &dyn Console {
        self.console.as_ref()
    }

    pub fn launcher(&self) -> &Launcher {
        &self.launcher
    }

    /// Disk cache size given at power-on.
    pub fn cache_size(&self) -> Option<usize> {
        self.machine.get().map(|m| m.cache_size)
    }

    pub fn is_powered_on(&self) -> bool {
        self.machine.get().is_some()
    }

    /// The single entry point. Returns the call's result or a negative
    /// error code; a panic in a handler becomes a bad argument.
    pub fn interrupt(self: &Arc<Self>, interrupt: Interrupt) -> i32 {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.dispatch(interrupt)));
        match outcome {
            Ok(Ok(rc)) => rc,
            Ok(Err(e)) => {
                debug!(error = %e, "interrupt failed");
                e.code().code()
            }
            Err(payload) => {
                warn!(reason = %panic_message(payload.as_ref()), "interrupt handler panicked");
                ErrorCode::BadArgument.code()
            }
        }
    }

    fn dispatch(self: &Arc<Self>, interrupt: Interrupt) -> KernelResult<i32> {
        match interrupt {
            Interrupt::User(call) => {
                let handler = self
                    .syscalls
                    .lookup(call.id)
                    .ok_or(KernelError::UnknownSyscall(call.id))?;
                handler(self, &call.args)
            }
            Interrupt::DiskComplete => {
                self.completions.signal();
                Ok(0)
            }
            Interrupt::PowerOn(boot) => self.power_on(boot),
        }
    }

    fn power_on(self: &Arc<Self>, boot: PowerOn) -> KernelResult<i32> {
        if self.is_powered_on() {
            return Err(KernelError::AlreadyPoweredOn);
        }

        let device: Arc<dyn BlockDevice> = match &boot.disk {
            DiskHandle::Fast(disk) => Arc::clone(disk) as Arc<dyn BlockDevice>,
            DiskHandle::Async(disk) => {
                let kernel = Arc::downgrade(self);
                disk.set_completion_handler(Arc::new(move || raise_disk_complete(&kernel)));
                Arc::new(InterruptDrivenDisk::new(
                    Arc::clone(disk),
                    Arc::clone(&self.completions),
                ))
            }
        };
        let fs = FileSystem::mount(device).map_err(|e| self.escalate(e))?;

        let geometry = boot.disk.geometry();
        let machine = Machine {
            cache_size: boot.cache_size,
            disk: boot.disk,
            fs: Mutex::new(fs),
        };
        if self.machine.set(machine).is_err() {
            return Err(KernelError::AlreadyPoweredOn);
        }
        info!(
            disk_size = geometry.disk_size,
            block_size = geometry.block_size,
            cache_size = boot.cache_size,
            "kernel powered on"
        );

        self.announce(&format!("Kernel: Disk is {} blocks\n", geometry.disk_size));
        self.announce(&format!("Kernel: Disk cache size is {} blocks\n", boot.cache_size));

        let rc = self.run_shell(&boot.shell_command);
        self.halt();
        rc
    }

    fn run_shell(self: &Arc<Self>, command: &str) -> KernelResult<i32> {
        let mut tokens = command.split_whitespace();
        let Some(name) = tokens.next() else {
            self.announce("Kernel: No shell specified\n");
            return Err(KernelError::BadArgument("empty shell command".into()));
        };
        let args = tokens.map(str::to_string).collect();

        let library = Library::new(Arc::clone(self));
        if let Err(e) = self.launcher.launch(&library, name, args) {
            warn!(error = %e, "initial program failed to start");
            self.announce(&format!("Kernel: Unable to start {command}!\n"));
            return Err(e.into());
        }

        self.launcher.join_all();
        self.announce(&format!("Kernel: {command} has terminated.\n"));
        Ok(0)
    }

    /// Kernel messages during power-on. A dead console does not stop the
    /// boot sequence.
    fn announce(&self, text: &str) {
        if let Err(e) = self.console.write(text) {
            warn!(error = %e, "console write failed");
        }
    }

    /// Flushes the disk and stops the slow disk's worker.
    fn halt(&self) {
        let Some(machine) = self.machine.get() else {
            return;
        };
        if let Err(e) = machine.fs.lock().sync() {
            self.escalate(e);
        }
        if let DiskHandle::Async(disk) = &machine.disk {
            disk.shutdown();
        }
        let stats = machine.disk.stats();
        info!(reads = stats.reads, writes = stats.writes, "kernel halted");
    }

    /// Runs `op` on the mounted file system. Device faults never come back:
    /// they crash the machine.
    pub(crate) fn with_fs<T>(
        &self,
        op: impl FnOnce(&mut FileSystem) -> fs::error::Result<T>,
    ) -> KernelResult<T> {
        let machine = self.machine.get().ok_or(KernelError::NotPoweredOn)?;
        let mut fs = machine.fs.lock();
        op(&mut fs).map_err(|e| self.escalate(e))
    }

    fn escalate(&self, e: FileSystemError) -> KernelError {
        match e {
            FileSystemError::Device(fault) => crash(&fault),
            other => other.into(),
        }
    }
}

fn raise_disk_complete(kernel: &Weak<Kernel>) {
    if let Some(kernel) = kernel.upgrade() {
        kernel.interrupt(Interrupt::DiskComplete);
    }
}

/// Stops the whole machine after a disk protocol violation.
pub fn crash(fault: &DiskFault) -> ! {
    error!(%fault, "disk fault");
    eprintln!("{fault}");
    process::exit(1);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        disk::{FastDisk, Geometry},
        kernel::{
            console::StreamConsole,
            syscall::{Arg, SYSCALL_GET_BLOCK_SIZE, SYSCALL_OUTPUT},
        },
        utils::temp_image_path,
    };
    use std::io::{self, Cursor, Write};

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl Captured {
        fn text(&self) -> String {
            String::from_utf8_lossy(&self.0.lock()).into_owned()
        }
    }

    impl Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn quiet_kernel(programs: ProgramRegistry) -> (Arc<Kernel>, Captured) {
        let out = Captured::default();
        let console = Arc::new(StreamConsole::new(Cursor::new(""), out.clone()));
        (Kernel::new(console, programs), out)
    }

    fn fast_boot(shell: &str) -> PowerOn {
        let disk = FastDisk::new(Geometry::new(16), temp_image_path()).unwrap();
        PowerOn {
            cache_size: 10,
            disk: DiskHandle::Fast(Arc::new(disk)),
            shell_command: shell.to_string(),
        }
    }

    #[test]
    fn unknown_syscalls_are_bad_arguments() {
        let (kernel, _) = quiet_kernel(ProgramRegistry::new());
        let rc = kernel.interrupt(Interrupt::User(Syscall::new(99)));
        assert_eq!(rc, ErrorCode::BadArgument.code());
    }

    #[test]
    fn missing_arguments_are_bad_arguments() {
        let (kernel, _) = quiet_kernel(ProgramRegistry::new());
        let rc = kernel.interrupt(Interrupt::User(Syscall::new(SYSCALL_OUTPUT)));
        assert_eq!(rc, ErrorCode::BadArgument.code());
    }

    #[test]
    fn output_reaches_the_console() {
        let (kernel, out) = quiet_kernel(ProgramRegistry::new());
        let call = Syscall::new(SYSCALL_OUTPUT).arg(Arg::Text("hi there\n".into()));
        assert_eq!(kernel.interrupt(Interrupt::User(call)), 0);
        assert_eq!(out.text(), "hi there\n");
    }

    #[test]
    fn a_panicking_handler_does_not_take_the_kernel_down() {
        let mut table = SyscallTable::standard();
        table.register(42, |_, _| panic!("handler bug"));
        let console = Arc::new(StreamConsole::new(Cursor::new(""), io::sink()));
        let kernel = Kernel::with_syscalls(console, ProgramRegistry::new(), table);

        assert_eq!(
            kernel.interrupt(Interrupt::User(Syscall::new(42))),
            ErrorCode::BadArgument.code()
        );
        let call = Syscall::new(SYSCALL_OUTPUT).arg(Arg::Text("still alive".into()));
        assert_eq!(kernel.interrupt(Interrupt::User(call)), 0);
    }

    #[test]
    fn file_calls_need_power() {
        let (kernel, _) = quiet_kernel(ProgramRegistry::new());
        let rc = kernel.interrupt(Interrupt::User(Syscall::new(SYSCALL_GET_BLOCK_SIZE)));
        assert_eq!(rc, ErrorCode::BadArgument.code());
    }

    #[test]
    fn power_on_runs_the_shell_and_halts() {
        let mut programs = ProgramRegistry::new();
        programs.register("Hello", |lib, args| {
            lib.output(format!("hello {}\n", args.join(" ")));
            0
        });
        let (kernel, out) = quiet_kernel(programs);

        assert_eq!(kernel.interrupt(Interrupt::PowerOn(fast_boot("Hello big world"))), 0);
        assert_eq!(kernel.cache_size(), Some(10));
        assert_eq!(
            out.text(),
            "Kernel: Disk is 16 blocks\n\
             Kernel: Disk cache size is 10 blocks\n\
             hello big world\n\
             Kernel: Hello big world has terminated.\n"
        );
    }

    struct BrokenPipe;

    impl Write for BrokenPipe {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::ErrorKind::BrokenPipe.into())
        }

        fn flush(&mut self) -> io::Result<()> {
            Err(io::ErrorKind::BrokenPipe.into())
        }
    }

    #[test]
    fn a_dead_console_does_not_stop_the_boot() {
        let ran = Arc::new(Mutex::new(false));
        let flag = Arc::clone(&ran);
        let mut programs = ProgramRegistry::new();
        programs.register("Nop", move |_, _| {
            *flag.lock() = true;
            0
        });
        let console = Arc::new(StreamConsole::new(Cursor::new(""), BrokenPipe));
        let kernel = Kernel::new(console, programs);

        let image = temp_image_path();
        let disk = FastDisk::new(Geometry::new(16), &image).unwrap();
        let rc = kernel.interrupt(Interrupt::PowerOn(PowerOn {
            cache_size: 10,
            disk: DiskHandle::Fast(Arc::new(disk)),
            shell_command: "Nop".into(),
        }));

        assert_eq!(rc, 0);
        assert!(*ran.lock());
        assert!(image.exists());
        std::fs::remove_file(image).unwrap();
    }

    #[test]
    fn a_second_power_on_is_rejected() {
        let mut programs = ProgramRegistry::new();
        programs.register("Nop", |_, _| 0);
        let (kernel, _) = quiet_kernel(programs);

        assert_eq!(kernel.interrupt(Interrupt::PowerOn(fast_boot("Nop"))), 0);
        assert_eq!(
            kernel.interrupt(Interrupt::PowerOn(fast_boot("Nop"))),
            ErrorCode::BadArgument.code()
        );
    }

    #[test]
    fn an_unknown_shell_is_reported() {
        let (kernel, out) = quiet_kernel(ProgramRegistry::new());
        let rc = kernel.interrupt(Interrupt::PowerOn(fast_boot("Ghost -x")));
        assert_eq!(rc, ErrorCode::NoClass.code());
        assert!(out.text().ends_with("Kernel: Unable to start Ghost -x!\n"));
    }

    #[test]
    fn an_empty_shell_command_is_a_bad_argument() {
        let (kernel, _) = quiet_kernel(ProgramRegistry::new());
        let rc = kernel.interrupt(Interrupt::PowerOn(fast_boot("   ")));
        assert_eq!(rc, ErrorCode::BadArgument.code());
    }
}
