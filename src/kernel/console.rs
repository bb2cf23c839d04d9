use std::{
    io::{self, BufRead, BufReader, Write},
    path::PathBuf,
    sync::mpsc::{self, Receiver, Sender},
    thread,
};

use parking_lot::Mutex;
use reedline::{
    DefaultCompleter, DefaultPrompt, DefaultPromptSegment, FileBackedHistory, Reedline, Signal,
};
use tracing::{debug, warn};

use crate::shell::COMMAND_WORDS;

/// The terminal behind the OUTPUT and INPUT syscalls.
pub trait Console: Send + Sync {
    fn write(&self, text: &str) -> io::Result<()>;

    /// Blocks until a whole line is available. `None` means end of input.
    fn read_line(&self) -> io::Result<Option<String>>;
}

/// A console over plain byte streams: stdin/stdout, a file, or memory.
pub struct StreamConsole {
    input: Mutex<Box<dyn BufRead + Send>>,
    output: Mutex<Box<dyn Write + Send>>,
}

impl StreamConsole {
    pub fn new(input: impl BufRead + Send + 'static, output: impl Write + Send + 'static) -> Self {
        Self {
            input: Mutex::new(Box::new(input)),
            output: Mutex::new(Box::new(output)),
        }
    }

    pub fn stdio() -> Self {
        Self::new(BufReader::new(io::stdin()), io::stdout())
    }
}

impl Console for StreamConsole {
    fn write(&self, text: &str) -> io::Result<()> {
        let mut output = self.output.lock();
        output.write_all(text.as_bytes())?;
        output.flush()
    }

    fn read_line(&self) -> io::Result<Option<String>> {
        let mut line = String::new();
        if self.input.lock().read_line(&mut line)? == 0 {
            return Ok(None);
        }
        let trimmed = line.trim_end_matches(['\n', '\r']).len();
        line.truncate(trimmed);
        Ok(Some(line))
    }
}

type LineReply = io::Result<Option<String>>;

/// An interactive console with history and completion.
///
/// The line editor lives on its own thread; INPUT sends it a request and
/// waits for the reply, one reader at a time.
pub struct LineEditorConsole {
    channel: Mutex<(Sender<()>, Receiver<LineReply>)>,
}

impl LineEditorConsole {
    pub fn spawn() -> io::Result<Self> {
        let (request_tx, request_rx) = mpsc::channel::<()>();
        let (reply_tx, reply_rx) = mpsc::channel::<LineReply>();

        thread::Builder::new()
            .name("console".into())
            .spawn(move || run_line_editor(request_rx, reply_tx))?;

        Ok(Self {
            channel: Mutex::new((request_tx, reply_rx)),
        })
    }
}

impl Console for LineEditorConsole {
    fn write(&self, text: &str) -> io::Result<()> {
        let mut stdout = io::stdout().lock();
        stdout.write_all(text.as_bytes())?;
        stdout.flush()
    }

    fn read_line(&self) -> io::Result<Option<String>> {
        let channel = self.channel.lock();
        let closed = || io::Error::new(io::ErrorKind::BrokenPipe, "console thread has exited");
        channel.0.send(()).map_err(|_| closed())?;
        channel.1.recv().map_err(|_| closed())?
    }
}

fn history_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".minikernel_history")
}

fn run_line_editor(requests: Receiver<()>, replies: Sender<LineReply>) {
    let mut line_editor = Reedline::create();
    match FileBackedHistory::with_file(100, history_path()) {
        Ok(history) => line_editor = line_editor.with_history(Box::new(history)),
        Err(e) => warn!(error = %e, "console history unavailable"),
    }

    let words = COMMAND_WORDS.iter().map(|w| w.to_string()).collect();
    let completer = DefaultCompleter::new_with_wordlen(words, 2);
    line_editor = line_editor.with_completer(Box::new(completer));

    let prompt = DefaultPrompt::new(
        DefaultPromptSegment::Basic(prompt_owner()),
        DefaultPromptSegment::Basic("minikernel".to_string()),
    );

    while requests.recv().is_ok() {
        let reply = match line_editor.read_line(&prompt) {
            Ok(Signal::Success(buffer)) => Ok(Some(buffer)),
            Ok(Signal::CtrlD) => Ok(None),
            // Ctrl-C abandons the current line.
            Ok(_) => Ok(Some(String::new())),
            Err(e) => Err(e),
        };
        if replies.send(reply).is_err() {
            break;
        }
    }
    debug!("console thread exiting");
}

/// `user@host` for the prompt. Hosts without a readable name show as
/// `localhost`.
fn prompt_owner() -> String {
    let host = whoami::fallible::hostname().unwrap_or_else(|_| "localhost".to_string());
    format!("{}@{host}", whoami::username())
}
