//! dual-capture console entry point

mod args;
#[cfg(not(target_os = "windows"))]
mod backend;
mod console;

use std::io;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;

use dual_capture_core::{
    InputStreamProvider, LoopbackStreamProvider, MockInputProvider, MockLoopbackProvider, OutputNaming, Recorder,
    RecorderConfiguration, RecorderShell,
};

use args::Cli;
use console::{ConsoleDisplay, LogDelegate};

const EXIT_ERROR: u8 = 1;

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(EXIT_ERROR);
        }
    };
    log::info!("Writing recordings to {}", config.output_directory.display());

    let outcome = if cli.simulate {
        log::info!("Using simulated devices");
        run(MockInputProvider::new(), MockLoopbackProvider::new(), config)
    } else {
        run_hardware(config)
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(EXIT_ERROR)
        }
    }
}

/// File (or default) configuration with command-line overrides applied.
fn load_config(cli: &Cli) -> Result<RecorderConfiguration, String> {
    let mut config = match cli.config {
        Some(ref path) => RecorderConfiguration::from_json_file(path).map_err(|e| e.to_string())?,
        None => RecorderConfiguration::default(),
    };
    if let Some(ref dir) = cli.output_dir {
        config.output_directory = dir.clone();
    }
    if cli.timestamped {
        config.naming = OutputNaming::Timestamped;
    }
    if cli.metadata {
        config.write_metadata = true;
    }
    Ok(config)
}

#[cfg(target_os = "windows")]
fn run_hardware(config: RecorderConfiguration) -> Result<(), String> {
    use dual_capture_windows::{WasapiInputProvider, WasapiLoopbackProvider};

    run(
        WasapiInputProvider::default_device(),
        WasapiLoopbackProvider::default_device(),
        config,
    )
}

#[cfg(not(target_os = "windows"))]
fn run_hardware(config: RecorderConfiguration) -> Result<(), String> {
    log::warn!("No capture backend for this platform; Start will report the device as unavailable");
    run(backend::UnavailableInput, backend::UnavailableLoopback, config)
}

fn run<I, L>(input: I, loopback: L, config: RecorderConfiguration) -> Result<(), String>
where
    I: InputStreamProvider,
    L: LoopbackStreamProvider,
{
    let mut recorder = Recorder::new(input, loopback, config).map_err(|e| e.to_string())?;
    recorder.set_delegate(Arc::new(LogDelegate));

    let mut shell = RecorderShell::new(recorder, ConsoleDisplay);
    console::run(&mut shell, io::stdin().lock(), io::stdout()).map_err(|e| e.to_string())
}
