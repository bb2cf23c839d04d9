use crate::{error::error_message, kernel::program::ProgramRegistry, library::Library, shell};

/// Every program the boot image ships with.
pub fn standard_registry() -> ProgramRegistry {
    let mut programs = ProgramRegistry::new();
    programs
        .register("FileTester", shell::file_tester)
        .register("Echo", echo)
        .register("Parallel", parallel)
        .declare("Library");
    programs
}

/// Prints its arguments on one line.
fn echo(lib: &Library, args: &[String]) -> i32 {
    lib.output(format!("{}\n", args.join(" ")))
}

/// Runs `&`-separated commands side by side and waits for all of them,
/// e.g. `Parallel Echo one & Echo two`.
fn parallel(lib: &Library, args: &[String]) -> i32 {
    let line = args.join(" ");
    let mut pids = Vec::new();
    for command in line.split('&') {
        let mut words = command.split_whitespace();
        let Some(name) = words.next() else {
            continue;
        };
        let pid = lib.exec(name, words);
        if pid < 0 {
            lib.output(format!("Parallel: cannot run {name}: {}\n", error_message(pid)));
            continue;
        }
        pids.push(pid);
    }

    let mut status = 0;
    for pid in pids {
        let rc = lib.join(pid);
        if rc != 0 {
            status = rc;
        }
    }
    status
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        disk::{DiskHandle, FastDisk, Geometry},
        kernel::{console::StreamConsole, Interrupt, Kernel, PowerOn},
        utils::temp_image_path,
    };
    use parking_lot::Mutex;
    use std::{
        io::{self, Cursor, Write},
        sync::Arc,
    };

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn boot(shell: &str) -> (i32, String) {
        let out = Captured::default();
        let console = Arc::new(StreamConsole::new(Cursor::new(""), out.clone()));
        let kernel = Kernel::new(console, standard_registry());
        let disk = FastDisk::new(Geometry::new(8), temp_image_path()).unwrap();
        let rc = kernel.interrupt(Interrupt::PowerOn(PowerOn {
            cache_size: 10,
            disk: DiskHandle::Fast(Arc::new(disk)),
            shell_command: shell.into(),
        }));
        let bytes = out.0.lock().clone();
        (rc, String::from_utf8_lossy(&bytes).into_owned())
    }

    #[test]
    fn echo_prints_its_arguments() {
        let (rc, text) = boot("Echo hello world");
        assert_eq!(rc, 0);
        assert!(text.contains("hello world\n"));
    }

    #[test]
    fn parallel_runs_every_command() {
        let (rc, text) = boot("Parallel Echo one & Echo two & Nope");
        assert_eq!(rc, 0);
        assert!(text.contains("one\n"));
        assert!(text.contains("two\n"));
        assert!(text.contains("Parallel: cannot run Nope: No such class\n"));
    }

    #[test]
    fn the_library_itself_cannot_be_run() {
        let (rc, text) = boot("Library");
        assert_eq!(rc, crate::error::ErrorCode::NoMain.code());
        assert!(text.contains("Kernel: Unable to start Library!\n"));
    }
}
