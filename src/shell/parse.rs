use thiserror::Error;

use crate::shell::command::Command;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("unknown command")]
    Unknown(String),

    #[error("Incorrect number of arguments")]
    Usage(&'static str),
}

/// Turns one script or console line into a command. Command names are case
/// insensitive; `write` keeps everything after the file name verbatim.
pub fn parse_command(line: &str) -> Result<Command, ParseError> {
    let line = line.trim();
    let tokens: Vec<&str> = line.split_ascii_whitespace().collect();
    let Some(&cmd) = tokens.first() else {
        return Err(ParseError::Unknown(String::new()));
    };
    let args = &tokens[1..];
    let name = cmd.to_ascii_lowercase();

    let first = |usage| args.first().map(|s| s.to_string()).ok_or(ParseError::Usage(usage));

    let command = match name.as_str() {
        "help" | "?" => Command::Help,
        "quit" => Command::Quit,
        "format" => Command::Format,
        "create" => Command::Create(first("create pathname")?),
        "read" => Command::Read(first("read pathname")?),
        "write" => {
            let file = first("write pathname data")?;
            Command::Write(file, write_payload(line))
        }
        "writeln" => Command::WriteLines(first("writeln pathname")?),
        "rm" => Command::Rm(first("rm pathname")?),
        "ls" => Command::Ls,
        "exec" => {
            let program = first("exec program [args...]")?;
            Command::Exec(program, args[1..].iter().map(|s| s.to_string()).collect())
        }
        "join" => {
            let pid = first("join pid")?;
            let pid = pid.parse().map_err(|_| ParseError::Usage("join pid"))?;
            Command::Join(pid)
        }
        "cd" | "pwd" | "mkdir" | "rmdir" | "ln" | "readlink" => Command::Unsupported(name),
        _ => return Err(ParseError::Unknown(cmd.to_string())),
    };
    Ok(command)
}

/// Text after the second space of a `write` line; empty when there is none.
fn write_payload(line: &str) -> String {
    let Some(first) = line.find(' ') else {
        return String::new();
    };
    match line[first + 1..].find(' ') {
        Some(second) => line[first + 1 + second + 1..].to_string(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_case_insensitive() {
        assert_eq!(parse_command("HELP"), Ok(Command::Help));
        assert_eq!(parse_command("?"), Ok(Command::Help));
        assert_eq!(parse_command("Create notes"), Ok(Command::Create("notes".into())));
        assert_eq!(parse_command("QUIT"), Ok(Command::Quit));
    }

    #[test]
    fn write_keeps_the_rest_of_the_line() {
        assert_eq!(
            parse_command("write f one  two three"),
            Ok(Command::Write("f".into(), "one  two three".into()))
        );
        assert_eq!(parse_command("write f"), Ok(Command::Write("f".into(), String::new())));
        assert_eq!(
            parse_command("write"),
            Err(ParseError::Usage("write pathname data"))
        );
    }

    #[test]
    fn exec_and_join() {
        assert_eq!(
            parse_command("exec Echo a b"),
            Ok(Command::Exec("Echo".into(), vec!["a".into(), "b".into()]))
        );
        assert_eq!(parse_command("join 3"), Ok(Command::Join(3)));
        assert_eq!(parse_command("join x"), Err(ParseError::Usage("join pid")));
    }

    #[test]
    fn directory_commands_are_unsupported() {
        assert_eq!(parse_command("mkdir d"), Ok(Command::Unsupported("mkdir".into())));
        assert_eq!(parse_command("PWD"), Ok(Command::Unsupported("pwd".into())));
    }

    #[test]
    fn unknown_and_missing_arguments() {
        assert_eq!(parse_command("frobnicate"), Err(ParseError::Unknown("frobnicate".into())));
        assert_eq!(parse_command("rm"), Err(ParseError::Usage("rm pathname")));
    }
}
