//! Append-only transcript logging.
//!
//! Optional: without a log file the state is inert and every call is a
//! cheap no-op. Each enabled session starts with a timestamped header so
//! concatenated sessions stay readable.

use std::fs::OpenOptions;
use std::io::Write;

use chrono::Local;

pub struct LoggingState {
    file_path: Option<String>,
    is_active: bool,
}

impl LoggingState {
    pub fn new(log_file: Option<String>) -> Result<Self, Box<dyn std::error::Error>> {
        let mut logging = LoggingState {
            file_path: None,
            is_active: false,
        };
        if let Some(path) = log_file {
            logging.enable(path)?;
        }
        Ok(logging)
    }

    /// Enable logging to `path`, verifying write access by appending the
    /// session header immediately.
    pub fn enable(&mut self, path: String) -> Result<(), Box<dyn std::error::Error>> {
        let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
        writeln!(
            file,
            "## Logging started {}",
            Local::now().format("%Y-%m-%d %H:%M")
        )?;
        writeln!(file)?;
        file.flush()?;

        self.file_path = Some(path);
        self.is_active = true;
        Ok(())
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    /// Append one transcript entry, preserving its line structure, followed
    /// by a blank spacer line.
    pub fn log_message(&self, content: &str) -> Result<(), Box<dyn std::error::Error>> {
        let (Some(file_path), true) = (self.file_path.as_ref(), self.is_active) else {
            return Ok(());
        };

        let mut file = OpenOptions::new().create(true).append(true).open(file_path)?;
        for line in content.lines() {
            writeln!(file, "{line}")?;
        }
        writeln!(file)?;
        file.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn enabled_logging_writes_header_and_messages() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("chat.log");
        let logging =
            LoggingState::new(Some(path.to_string_lossy().into_owned())).expect("logging");
        assert!(logging.is_active());

        logging.log_message("You: hello").expect("log");
        logging.log_message("Assistant: hi\nthere").expect("log");

        let contents = std::fs::read_to_string(&path).expect("read log");
        assert!(contents.starts_with("## Logging started"));
        assert!(contents.contains("You: hello"));
        assert!(contents.contains("Assistant: hi\nthere\n"));
    }

    #[test]
    fn disabled_logging_is_inert() {
        let logging = LoggingState::new(None).expect("logging");
        assert!(!logging.is_active());
        logging.log_message("dropped").expect("no-op");
    }
}
