pub mod command;
pub mod parse;

use std::{fs, path::Path};

use tracing::{debug, warn};

use crate::{
    error::ErrorCode,
    library::Library,
    shell::{
        command::{execute_command, Command},
        parse::{parse_command, ParseError},
    },
};

/// Words offered by tab completion on the interactive console.
pub const COMMAND_WORDS: [&str; 17] = [
    "help", "quit", "format", "create", "read", "write", "writeln", "rm", "ls", "exec", "join",
    "cd", "pwd", "mkdir", "rmdir", "ln", "readlink",
];

/// Where the shell gets its lines: a script file or the console.
pub trait LineSource {
    fn next_line(&mut self) -> Option<String>;

    /// Scripts echo what they run; the console does not.
    fn echoes(&self) -> bool;
}

struct Script(std::vec::IntoIter<String>);

impl LineSource for Script {
    fn next_line(&mut self) -> Option<String> {
        self.0.next()
    }

    fn echoes(&self) -> bool {
        true
    }
}

struct ConsoleLines<'a>(&'a Library);

impl LineSource for ConsoleLines<'_> {
    fn next_line(&mut self) -> Option<String> {
        let mut line = String::new();
        (self.0.input(&mut line) >= 0).then_some(line)
    }

    fn echoes(&self) -> bool {
        false
    }
}

/// The `FileTester` program: runs file system commands from a script given
/// as its one argument, or from the console when there is none.
pub fn file_tester(lib: &Library, args: &[String]) -> i32 {
    match args {
        [] => run(lib, &mut ConsoleLines(lib)),
        [path] => match load_script(path) {
            Ok(mut script) => run(lib, &mut script),
            Err(e) => {
                warn!(path = %path, error = %e, "cannot open script");
                lib.output(format!("Error: Script file {path} not found.\n"));
                1
            }
        },
        _ => {
            lib.output("usage: FileTester [ script-file ]\n");
            ErrorCode::BadArgument.code()
        }
    }
}

fn load_script(path: impl AsRef<Path>) -> std::io::Result<Script> {
    let text = fs::read_to_string(path)?;
    let lines: Vec<String> = text.lines().map(str::to_string).collect();
    Ok(Script(lines.into_iter()))
}

/// The command loop. Ends at end of input or on `quit`.
pub fn run(lib: &Library, lines: &mut dyn LineSource) -> i32 {
    loop {
        if !lines.echoes() {
            lib.output("--> ");
        }
        let Some(line) = lines.next_line() else {
            return 0;
        };
        let line = line.trim();
        if line.is_empty() || line.starts_with("/*") {
            continue;
        }
        if line.starts_with("//") {
            if lines.echoes() {
                lib.output(format!("{line}\n"));
            }
            continue;
        }
        if lines.echoes() {
            lib.output(format!("--> {line}\n"));
        }

        let cmd = match parse_command(line) {
            Ok(cmd) => cmd,
            Err(ParseError::Unknown(_)) => {
                lib.output("unknown command\n");
                continue;
            }
            Err(e) => {
                if let ParseError::Usage(usage) = e {
                    lib.output(format!("{e}\nusage: {usage}\n"));
                }
                continue;
            }
        };

        let result = execute_command(lib, &cmd, lines);
        debug!(?cmd, result, "shell command finished");
        if cmd == Command::Quit {
            return 0;
        }
        report(lib, result);
    }
}

fn report(lib: &Library, result: i32) {
    match result {
        0 => {}
        -1 => {
            lib.output("*** System call failed\n");
        }
        rc => {
            lib.output(format!("*** Bad result {rc} from system call\n"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        disk::{DiskHandle, FastDisk, Geometry},
        kernel::{console::StreamConsole, program::ProgramRegistry, Interrupt, Kernel, PowerOn},
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

    /// Boots a fast disk with the shell reading `input` from the console
    /// and returns everything it printed.
    fn session(input: &str) -> String {
        let out = Captured::default();
        let console = Arc::new(StreamConsole::new(Cursor::new(input.to_string()), out.clone()));
        let mut programs = ProgramRegistry::new();
        programs.register("FileTester", file_tester);
        let kernel = Kernel::new(console, programs);

        let disk = FastDisk::new(Geometry::new(20), temp_image_path()).unwrap();
        let rc = kernel.interrupt(Interrupt::PowerOn(PowerOn {
            cache_size: 10,
            disk: DiskHandle::Fast(Arc::new(disk)),
            shell_command: "FileTester".into(),
        }));
        assert_eq!(rc, 0);
        let bytes = out.0.lock().clone();
        String::from_utf8_lossy(&bytes).into_owned()
    }

    #[test]
    fn interactive_file_round_trip() {
        let text = session("format\ncreate a\nwrite a hello there\nread a\nls\nquit\n");
        assert!(text.contains("Kernel: Disk formatted.\n"));
        assert!(text.contains("Kernel: Created file a at block 1.\n"));
        assert!(text.contains("--> hello there\n"));
        assert!(text.contains("--> a\n"));
        assert!(text.ends_with("Kernel: FileTester has terminated.\n"));
    }

    #[test]
    fn failures_are_reported() {
        let text = session("format\nread ghost\nmkdir d\nbogus\nrm\n");
        assert!(text.contains("*** System call failed\n"));
        assert!(text.contains("mkdir: not supported by this file system\n"));
        assert!(text.contains("unknown command\n"));
        assert!(text.contains("Incorrect number of arguments\nusage: rm pathname\n"));
    }

    #[test]
    fn a_long_name_is_a_user_error() {
        let long = "n".repeat(40);
        let text = session(&format!("format\ncreate {long}\n"));
        assert!(text.contains("Kernel: User error: File name too long!\n*** System call failed\n"));
        assert!(!text.contains("Bad result"));
    }

    #[test]
    fn file_system_user_errors_are_printed() {
        let text = session("format\ncreate a\ncreate a\nread ghost\nwrite ghost x\nrm ghost\n");
        assert!(text.contains("Kernel: User error: File name already exists at block 1!\n"));
        assert_eq!(text.matches("Kernel: User error: File not found.\n").count(), 3);
        assert_eq!(text.matches("*** System call failed\n").count(), 4);
    }

    #[test]
    fn writeln_collects_until_a_dot() {
        let text = session("format\ncreate f\nwriteln f\nfirst\nsecond\n.\nread f\n");
        assert!(text.contains("first\\n\nsecond\\n\n"));
    }

    #[test]
    fn script_mode_echoes_commands_and_comments() {
        let path = temp_image_path().with_extension("script");
        std::fs::write(
            &path,
            "// say hello\n/* hidden */\nformat\ncreate s\nwrite s scripted\nread s\n",
        )
        .unwrap();

        let text = session(&format!("exec FileTester {}\nquit\n", path.display()));
        assert!(text.contains("// say hello\n"));
        assert!(!text.contains("hidden"));
        assert!(text.contains("--> write s scripted\n"));
        assert!(text.contains("scripted\n"));

        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn a_missing_script_is_reported() {
        let text = session("exec FileTester /no/such/script\n");
        assert!(text.contains("Error: Script file /no/such/script not found.\n"));
    }
}
