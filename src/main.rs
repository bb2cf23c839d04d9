use std::{
    error::Error,
    io::{self, stdout, IsTerminal},
    process::ExitCode,
    sync::Arc,
    time::Duration,
};

use clap::Parser;
use colored::*;
use crossterm::{
    execute,
    style::{Color, Print, ResetColor, SetForegroundColor},
};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use minikernel::{
    config::BootConfig,
    kernel::console::{Console, LineEditorConsole, StreamConsole},
    programs::standard_registry,
    Interrupt, Kernel, PowerOn,
};

/// Boots the simulated machine and runs the initial program
#[derive(Parser)]
#[command(name = "minikernel")]
#[command(version)]
#[command(about = "A simulated kernel with a disk, processes and a flat file system", long_about = None)]
struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(flatten)]
    boot: BootConfig,
}

fn main() -> Result<ExitCode, Box<dyn Error>> {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level)))
        .init();

    let interactive = io::stdin().is_terminal();
    if stdout().is_terminal() {
        banner()?;
    }

    let boot = cli.boot;
    let disk = {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(ProgressStyle::with_template("{spinner:.cyan} {msg}")?);
        spinner.set_message(format!("Loading disk image {}", boot.image.display()));
        spinner.enable_steady_tick(Duration::from_millis(80));
        let disk = boot.build_disk();
        spinner.finish_and_clear();
        disk.map_err(|e| {
            error!(error = %e, "cannot build disk");
            e
        })?
    };

    let console: Arc<dyn Console> = if interactive {
        Arc::new(LineEditorConsole::spawn()?)
    } else {
        Arc::new(StreamConsole::stdio())
    };
    let kernel = Kernel::new(console, standard_registry());

    println!("Boot: Starting kernel.");
    let rc = kernel.interrupt(Interrupt::PowerOn(PowerOn {
        cache_size: boot.cache_size,
        disk,
        shell_command: boot.shell_command(),
    }));
    println!("Boot: Kernel has stopped.");
    info!(rc, "kernel returned");

    Ok(if rc == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn banner() -> io::Result<()> {
    execute!(
        stdout(),
        SetForegroundColor(Color::Cyan),
        Print(format!("minikernel v{}\n", env!("CARGO_PKG_VERSION"))),
        ResetColor
    )?;
    println!(
        "{}",
        "Type 'help' for available commands. Use ↑↓ for history, Tab for auto-completion.\n"
            .bright_black()
    );
    Ok(())
}
