use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::error::ErrorKind;
use clap::Parser;
use paswitch_core::{EventLoop, PulseClient, SwitchError};
use tracing::Level;

#[derive(Parser, Debug)]
#[command(author, version, about = "PulseAudio commandline sink switcher", long_about = None)]
struct Args {
    /// Name of the sink to make the default
    #[arg(value_name = "SINK")]
    sink: Vec<String>,

    /// Server to connect to instead of the default one
    #[arg(short, long, value_name = "ADDRESS")]
    server: Option<String>,

    /// Log more (repeat for more detail)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Args {
    /// The single sink name, if exactly one was given.
    fn target(&self) -> Option<&str> {
        match self.sink.as_slice() {
            [sink] => Some(sink.as_str()),
            _ => None,
        }
    }
}

fn usage() -> String {
    format!(
        "PulseAudio commandline sink switcher {}\n\
         Copyright (C) 2012 by Tomaz Solc <tomaz.solc@tablix.org>\n\n\
         USAGE: paswitch [ sink ]\n",
        env!("CARGO_PKG_VERSION")
    )
}

fn log_level(verbose: u8) -> Level {
    match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

fn run(sink: &str, server: Option<&str>) -> Result<u8> {
    let client = PulseClient::new().context("can't get pulseaudio context.")?;
    let mut event_loop =
        EventLoop::new(client, sink).on_error(|err: &SwitchError| println!("{}", err));

    let outcome = match event_loop.run(server) {
        Ok(outcome) => outcome,
        Err(e @ SwitchError::Connect(_)) => {
            return Err(e).context("can't get pulseaudio context.");
        }
        Err(e) => return Err(e).context("event loop failed."),
    };
    tracing::info!(
        "Moved {} stream-restore records to {}",
        outcome.writes_issued,
        sink
    );
    Ok(if outcome.exit_code == 0 { 0 } else { 1 })
}

fn main() -> ExitCode {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            let _ = e.print();
            return ExitCode::SUCCESS;
        }
        Err(_) => {
            print!("{}", usage());
            return ExitCode::SUCCESS;
        }
    };

    let Some(sink) = args.target() else {
        print!("{}", usage());
        return ExitCode::SUCCESS;
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level(args.verbose))
        .with_writer(std::io::stderr)
        .init();

    match run(sink, args.server.as_deref()) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            // Outermost context last, matching the order the steps failed in.
            for cause in e.chain().rev() {
                println!("{}", cause);
            }
            ExitCode::FAILURE
        }
    }
}
