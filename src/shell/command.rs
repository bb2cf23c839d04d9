use std::fmt::Write as _;

use colored::*;

use crate::{error::ErrorCode, library::Library, shell::LineSource};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    Quit,
    Format,
    Create(String),
    Read(String),
    Write(String, String),
    WriteLines(String),
    Rm(String),
    Ls,
    Exec(String, Vec<String>),
    Join(i32),
    /// Directory and link commands; the flat file system has none.
    Unsupported(String),
}

/// Runs one command and returns the system call result the shell reports.
pub fn execute_command(lib: &Library, cmd: &Command, lines: &mut dyn LineSource) -> i32 {
    match cmd {
        Command::Help => {
            print_help(lib);
            0
        }
        Command::Quit => lib.shutdown(),
        Command::Format => lib.format(),
        Command::Create(name) => lib.create(name),
        Command::Read(name) => read_file(lib, name),
        Command::Write(name, data) => lib.write(name, data.as_bytes()),
        Command::WriteLines(name) => {
            let mut data = Vec::new();
            while let Some(line) = lines.next_line() {
                if line == "." {
                    break;
                }
                data.extend_from_slice(line.as_bytes());
                data.push(b'\n');
            }
            lib.write(name, &data)
        }
        Command::Rm(name) => lib.delete(name),
        Command::Ls => {
            let mut names = Vec::new();
            let rc = lib.readdir(&mut names);
            if rc < 0 {
                return rc;
            }
            for name in names {
                lib.output(format!("{name}\n"));
            }
            rc
        }
        Command::Exec(program, args) => {
            let pid = lib.exec(program, args.iter().cloned());
            if pid < 0 {
                return pid;
            }
            lib.output(format!("Started {program} as process {pid}\n"));
            0
        }
        Command::Join(pid) => {
            let rc = lib.join(*pid);
            if rc == ErrorCode::NoSuchProcess.code() {
                return rc;
            }
            lib.output(format!("Process {pid} exited with {rc}\n"));
            0
        }
        Command::Unsupported(name) => {
            lib.output(format!("{name}: not supported by this file system\n"));
            ErrorCode::BadArgument.code()
        }
    }
}

fn read_file(lib: &Library, name: &str) -> i32 {
    let size = lib.block_size();
    if size < 0 {
        return size;
    }
    let mut buf = vec![0; size as usize];
    let n = lib.read(name, &mut buf);
    if n < 0 {
        return n;
    }
    lib.output(render_bytes(&buf));
    0
}

/// Printable form of file contents. Zero bytes are skipped, newlines shown
/// as `\n` and other unprintable bytes in octal.
pub fn render_bytes(bytes: &[u8]) -> String {
    let mut out = String::new();
    let mut need_newline = false;
    for &b in bytes.iter().filter(|&&b| b != 0) {
        match b {
            b' '..=b'~' if b != b'\\' => out.push(b as char),
            b'\\' => out.push_str("\\\\"),
            b'\n' => out.push_str("\\n\n"),
            _ => {
                let _ = write!(out, "\\{b:03o}");
            }
        }
        need_newline = b != b'\n';
    }
    if need_newline {
        out.push('\n');
    }
    out
}

const HELP_LINES: [&str; 17] = [
    "help",
    "quit",
    "format",
    "cd pathname",
    "pwd",
    "create pathname",
    "read pathname",
    "write pathname data",
    "writeln pathname",
    "rm pathname",
    "mkdir pathname",
    "rmdir pathname",
    "ln oldpath newpath",
    "readlink pathname",
    "ls [ dirname ]",
    "exec program [args...]",
    "join pid",
];

fn print_help(lib: &Library) {
    let mut text = format!("{}\n", "Commands are:".bright_cyan().bold());
    for line in HELP_LINES {
        text.push_str(&format!("    {}\n", line.bright_black()));
    }
    lib.output(text);
}
