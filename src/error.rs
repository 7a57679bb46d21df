use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("{path:?} is not a directory")]
    NotADirectory { path: PathBuf },

    #[error("Unable to list {path:?}: {source}")]
    Unlistable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl ScanError {
    pub fn unlistable(path: &PathBuf, source: io::Error) -> Self {
        ScanError::Unlistable {
            path: path.clone(),
            source,
        }
    }
}

/// Failure to run the encoder for a single file.
#[derive(Debug, Error)]
pub enum EncodeError {
    /// The encoder could not be started at all (missing binary, permissions).
    #[error("Unable to launch {program:?} for {path:?}: {source}")]
    Launch {
        program: PathBuf,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The encoder ran and exited non-zero. `output` is the combined stdout+stderr.
    #[error("Encoder exited with {} for {path:?}", describe_code(.code))]
    Failed {
        path: PathBuf,
        code: Option<i32>,
        output: String,
    },
}

impl EncodeError {
    /// Text that goes into the batch log under the file's ERROR header.
    pub fn log_text(&self) -> String {
        match self {
            EncodeError::Launch { .. } => format!("{}\n", self),
            EncodeError::Failed { output, .. } => output.clone(),
        }
    }
}

fn describe_code(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("status {}", code),
        None => String::from("no status (terminated by signal)"),
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum DriverError {
    #[error("A batch is already running.")]
    AlreadyRunning,
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Settings I/O error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Malformed settings in {path:?}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Fatal errors of the command-line front end.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("No input directory given and none remembered.")]
    NoInputDirectory,

    #[error("{program:?} is not installed or not on PATH.")]
    EncoderNotInstalled { program: PathBuf },

    #[error(transparent)]
    Scan(#[from] ScanError),

    #[error(transparent)]
    Driver(#[from] DriverError),

    #[error("The conversion worker panicked.")]
    WorkerPanicked,

    #[error("Unable to copy logs to the clipboard: {0}")]
    Clipboard(#[from] arboard::Error),

    #[error("Unable to write logs to {path:?}: {source}")]
    LogFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_log_text_is_process_output() {
        let err = EncodeError::Failed {
            path: PathBuf::from("/in/a.mkv"),
            code: Some(1),
            output: String::from("Invalid data found\n"),
        };
        assert_eq!(err.log_text(), "Invalid data found\n");
        assert_eq!(format!("{}", err), "Encoder exited with status 1 for \"/in/a.mkv\"");
    }

    #[test]
    fn test_launch_log_text_names_program() {
        let err = EncodeError::Launch {
            program: PathBuf::from("ffmpeg"),
            path: PathBuf::from("/in/a.mkv"),
            source: io::Error::new(io::ErrorKind::NotFound, "not found"),
        };
        assert!(err.log_text().starts_with("Unable to launch \"ffmpeg\""));
    }
}
