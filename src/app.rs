use std::fs;
use std::path::{self, Path, PathBuf};
use std::sync::Arc;
use std::sync::mpsc::Receiver;

use human_repr::HumanCount;
use kdam::{term, tqdm, Bar, BarExt};
use signal_hook::consts::{SIGINT, SIGTERM};

use crate::batch_processor::{BatchMessage, BatchProcessor};
use crate::batch_state::BatchReport;
use crate::codecs::AudioCodec;
use crate::error::{AppError, ScanError};
use crate::ffmpeg::FFmpeg;
use crate::filelist::FileList;
use crate::filelistitem::file_name_of;
use crate::filescanner::FileScanner;
use crate::fstools::{classify_path, DirEntryCategory};
use crate::settings::{Settings, SettingsStore};

#[derive(Clone, Debug)]
pub struct AppOptions {
    pub input: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub reset_output: bool,
    pub list_only: bool,
    pub show_logs: bool,
    pub copy_logs: bool,
    pub log_file: Option<PathBuf>,
    pub settings_path: PathBuf,
    pub ffmpeg: PathBuf,
    pub codec: AudioCodec,
}

/// Which actions are currently available to the user.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Controls {
    pub start_enabled: bool,
    pub stop_enabled: bool,
    pub logs_enabled: bool,
}

impl Controls {
    pub fn after_scan(files: &FileList) -> Self {
        Controls {
            start_enabled: !files.is_empty(),
            stop_enabled: false,
            logs_enabled: false,
        }
    }

    pub fn apply(&mut self, msg: &BatchMessage) {
        match msg {
            BatchMessage::Started { .. } => {
                self.start_enabled = false;
                self.stop_enabled = true;
            },
            BatchMessage::Finished(_) => {
                self.start_enabled = true;
                self.stop_enabled = false;
                self.logs_enabled = true;
            },
            _ => {},
        }
    }
}

/// The front end. Owns every piece of presentation state; the worker only
/// reaches it through `BatchMessage`s consumed on this thread.
pub struct App {
    options: AppOptions,
    store: SettingsStore,
    settings: Settings,
    files: FileList,
    controls: Controls,
    total: usize,
    progress: u8,
    logs: String,
    warnings: Vec<String>,
}

impl App {
    pub fn new(options: AppOptions) -> Self {
        let store = SettingsStore::new(options.settings_path.clone());
        let settings = store.load();
        App {
            options,
            store,
            settings,
            files: FileList::new(),
            controls: Controls::after_scan(&FileList::new()),
            total: 0,
            progress: 0,
            logs: String::new(),
            warnings: vec![],
        }
    }

    /// Returns the batch report, or `None` when nothing was converted.
    pub fn run(mut self) -> Result<Option<BatchReport>, AppError> {
        self.select_directories()?;
        let input = self.input_directory()?;
        self.list_files(&input)?;

        if self.options.list_only {
            return Ok(None);
        }
        if !self.controls.start_enabled {
            println!("Nothing to convert.");
            return Ok(None);
        }

        let report = self.start_conversion()?;
        self.show_logs()?;
        Ok(Some(report))
    }

    /// Only directories that exist are remembered; a bad selection leaves
    /// the stored settings untouched.
    fn select_directories(&mut self) -> Result<(), AppError> {
        let mut selected = self.settings.clone();
        if let Some(input) = &self.options.input {
            selected.last_directory = selected_directory(input)?;
        }
        if self.options.reset_output {
            selected.output_directory = String::new();
        } else if let Some(output) = &self.options.output {
            selected.output_directory = selected_directory(output)?;
        }
        if selected != self.settings {
            self.settings = selected;
            self.store.save(&self.settings);
        }
        Ok(())
    }

    fn input_directory(&self) -> Result<PathBuf, AppError> {
        match self.settings.input_dir() {
            None => Err(AppError::NoInputDirectory),
            Some(dir) => match classify_path(&dir) {
                DirEntryCategory::Directory => Ok(dir),
                _ => Err(AppError::Scan(ScanError::NotADirectory { path: dir })),
            },
        }
    }

    fn list_files(&mut self, input: &Path) -> Result<(), AppError> {
        FileScanner::new().rescan(input, &mut self.files)?;
        self.controls = Controls::after_scan(&self.files);
        self.progress = 0;
        self.logs.clear();

        println!("Input directory: {}", input.display());
        match self.settings.output_dir() {
            Some(dir) => println!("Output directory: {}", dir.display()),
            None => println!("Output directory: same as input"),
        }
        println!("Audio codec: {}", self.options.codec);
        for item in self.files.iter() {
            println!("  {}", item);
        }
        println!("{} file(s), {}", self.files.len(), self.files.total_size().human_count_bytes());
        Ok(())
    }

    fn start_conversion(&mut self) -> Result<BatchReport, AppError> {
        let ffmpeg = FFmpeg::new(self.options.ffmpeg.clone(), self.options.codec);
        if !ffmpeg.is_installed() {
            return Err(AppError::EncoderNotInstalled { program: self.options.ffmpeg.clone() });
        }

        let mut processor = BatchProcessor::new(ffmpeg, self.settings.output_dir());
        let messages = processor.subscribe();
        // first signal stops after the current file, a second one exits
        for signal in [SIGINT, SIGTERM] {
            let stop = processor.stop_flag();
            let registered = signal_hook::flag::register_conditional_shutdown(signal, 1, Arc::clone(&stop))
                .and_then(|_| signal_hook::flag::register(signal, stop));
            if let Err(err) = registered {
                tracing::warn!("unable to register handler for signal {}: {}", signal, err);
            }
        }

        let handle = processor.start(self.files.paths())?;
        // the worker holds the remaining senders, so the channel closes with it
        drop(processor);
        self.consume_messages(messages);
        let report = handle.join().map_err(|_| AppError::WorkerPanicked)?;

        println!("{}", report.summary());
        Ok(report)
    }

    fn consume_messages(&mut self, messages: Receiver<BatchMessage>) {
        term::init(false);
        let mut pbar = tqdm!(
            total = 100,
            desc = format!("converting {}", self.files.total_size().human_count_bytes()),
            position = 0,
            force_refresh = true
        );

        for msg in messages {
            let finished = self.handle_message(&msg);
            self.render(&msg, &mut pbar);
            if finished {
                break;
            }
        }
        eprintln!();
    }

    /// Applies one worker message to the presentation state. Returns true
    /// once the batch is over.
    fn handle_message(&mut self, msg: &BatchMessage) -> bool {
        self.controls.apply(msg);
        match msg {
            BatchMessage::Started { total } => {
                self.total = *total;
                false
            },
            BatchMessage::Progress(p) => {
                self.progress = *p;
                false
            },
            BatchMessage::FileConverted { path } => {
                tracing::info!("converted {:?}", path);
                false
            },
            BatchMessage::FileFailed { path, reason, .. } => {
                tracing::debug!("{}", reason);
                self.warnings.push(format!("Failed to convert {}", file_name_of(path)));
                false
            },
            BatchMessage::Finished(report) => {
                self.progress = report.progress;
                self.logs = report.log.clone();
                true
            },
            _ => false,
        }
    }

    fn render(&self, msg: &BatchMessage, pbar: &mut Bar) {
        match msg {
            BatchMessage::FileStarted { index, path } => {
                pbar.set_postfix(format!("{}/{} {}", index + 1, self.total, file_name_of(path)));
                let _ = pbar.refresh();
            },
            BatchMessage::FileFailed { .. } => {
                if let Some(warning) = self.warnings.last() {
                    let _ = pbar.write(format!("Conversion error: {}", warning));
                }
            },
            BatchMessage::Progress(_) | BatchMessage::Finished(_) => {
                let _ = pbar.update_to(self.progress as usize);
            },
            _ => {},
        }
    }

    fn show_logs(&self) -> Result<(), AppError> {
        if !self.controls.logs_enabled {
            return Ok(());
        }
        if self.options.show_logs {
            println!("--- FFmpeg logs ---");
            print!("{}", self.logs);
        }
        if let Some(path) = &self.options.log_file {
            fs::write(path, &self.logs).map_err(|source| AppError::LogFile {
                path: path.clone(),
                source,
            })?;
            println!("Logs written to {}", path.display());
        }
        if self.options.copy_logs {
            arboard::Clipboard::new()
                .and_then(|mut clipboard| clipboard.set_text(self.logs.clone()))?;
            println!("Logs copied to the clipboard.");
        }
        Ok(())
    }
}

fn selected_directory(p: &Path) -> Result<String, AppError> {
    match classify_path(p) {
        DirEntryCategory::Directory => Ok(path::absolute(p).unwrap_or_else(|_| p.to_path_buf()).display().to_string()),
        _ => Err(AppError::Scan(ScanError::NotADirectory { path: p.to_path_buf() })),
    }
}
