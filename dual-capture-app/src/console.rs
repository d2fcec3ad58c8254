//! Line-oriented console front end: `start`, `stop`, `status`, `quit`.

use std::io::{self, BufRead, Write};

use dual_capture_core::{
    CaptureDelegate, CaptureError, CaptureState, InputStreamProvider, LoopbackStreamProvider, MessageDisplay,
    RecorderShell, RecordingResult,
};

/// Console commands, one per input line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Stop,
    Status,
    Quit,
    Help,
}

impl Command {
    pub fn parse(line: &str) -> Option<Self> {
        match line.trim().to_ascii_lowercase().as_str() {
            "start" | "s" => Some(Self::Start),
            "stop" | "x" => Some(Self::Stop),
            "status" => Some(Self::Status),
            "quit" | "exit" | "q" => Some(Self::Quit),
            "help" | "?" => Some(Self::Help),
            _ => None,
        }
    }
}

const HELP: &str = "Commands: start, stop, status, quit";

/// Shows notices on stdout/stderr.
#[derive(Debug, Default)]
pub struct ConsoleDisplay;

impl MessageDisplay for ConsoleDisplay {
    fn show_info(&self, title: &str, message: &str) {
        println!("[{}] {}", title, message);
    }

    fn show_error(&self, title: &str, message: &str) {
        eprintln!("[{}] {}", title, message);
    }
}

/// Forwards recorder events to the log.
#[derive(Debug, Default)]
pub struct LogDelegate;

impl CaptureDelegate for LogDelegate {
    fn on_state_changed(&self, state: &CaptureState) {
        let name = match state {
            CaptureState::Idle => "idle",
            CaptureState::Recording { .. } => "recording",
            CaptureState::Stopping => "stopping",
            CaptureState::Completed(_) => "completed",
            CaptureState::Failed(_) => "failed",
        };
        log::debug!("Recorder state: {}", name);
    }

    fn on_error(&self, error: &CaptureError) {
        log::warn!("Capture issue: {}", error);
    }

    fn on_capture_finished(&self, result: &RecordingResult) {
        log::debug!(
            "Capture finished: {} ({}), {} ({})",
            result.mic.file_path.display(),
            result.mic.checksum,
            result.system.file_path.display(),
            result.system.checksum
        );
    }
}

/// Drive `shell` from `input` until `quit` or end of input.
///
/// A recording still running at that point is stopped and saved.
pub fn run<I, L, D, R, W>(
    shell: &mut RecorderShell<I, L, D>,
    input: R,
    mut prompt: W,
) -> io::Result<()>
where
    I: InputStreamProvider,
    L: LoopbackStreamProvider,
    D: MessageDisplay,
    R: BufRead,
    W: Write,
{
    writeln!(prompt, "{}", HELP)?;

    for line in input.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        match Command::parse(&line) {
            Some(Command::Start) => {
                if shell.press_start() {
                    writeln!(prompt, "Recording... type 'stop' to finish.")?;
                }
            }
            Some(Command::Stop) => {
                shell.press_stop();
            }
            Some(Command::Status) => writeln!(prompt, "{}", shell.status())?,
            Some(Command::Help) => writeln!(prompt, "{}", HELP)?,
            Some(Command::Quit) => break,
            None => writeln!(prompt, "Unknown command '{}'. {}", line.trim(), HELP)?,
        }
    }

    shell.shutdown();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use dual_capture_core::{MockInputProvider, MockLoopbackProvider, Recorder, RecorderConfiguration};
    use std::io::Cursor;

    struct Silent;

    impl MessageDisplay for Silent {
        fn show_info(&self, _title: &str, _message: &str) {}
        fn show_error(&self, _title: &str, _message: &str) {}
    }

    fn shell(dir: &std::path::Path) -> RecorderShell<MockInputProvider, MockLoopbackProvider, Silent> {
        let config = RecorderConfiguration {
            output_directory: dir.to_path_buf(),
            ..Default::default()
        };
        let recorder = Recorder::new(MockInputProvider::new(), MockLoopbackProvider::new(), config).unwrap();
        RecorderShell::new(recorder, Silent)
    }

    #[test]
    fn parses_commands() {
        assert_eq!(Command::parse(" START "), Some(Command::Start));
        assert_eq!(Command::parse("stop"), Some(Command::Stop));
        assert_eq!(Command::parse("q"), Some(Command::Quit));
        assert_eq!(Command::parse("record"), None);
    }

    #[test]
    fn session_from_script() {
        let dir = tempfile::tempdir().unwrap();
        let mut shell = shell(dir.path());
        let mut out = Vec::new();

        run(&mut shell, Cursor::new("start\nstatus\nstop\nquit\n"), &mut out).unwrap();

        let out = String::from_utf8(out).unwrap();
        assert!(out.contains("Recording..."));
        assert!(dir.path().join("mic_output.wav").exists());
        assert!(dir.path().join("system_output.wav").exists());
        assert!(!shell.recorder().is_recording());
    }

    #[test]
    fn end_of_input_saves_running_recording() {
        let dir = tempfile::tempdir().unwrap();
        let mut shell = shell(dir.path());

        run(&mut shell, Cursor::new("start\n"), io::sink()).unwrap();

        assert!(dir.path().join("mic_output.wav").exists());
        assert!(!shell.recorder().is_recording());
    }

    #[test]
    fn unknown_command_prints_help() {
        let dir = tempfile::tempdir().unwrap();
        let mut shell = shell(dir.path());
        let mut out = Vec::new();

        run(&mut shell, Cursor::new("record\n"), &mut out).unwrap();

        assert!(String::from_utf8(out).unwrap().contains("Unknown command 'record'"));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
