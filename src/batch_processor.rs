use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use crate::batch_state::{progress_percent, BatchOutcome, BatchReport, BatchStatus};
use crate::error::DriverError;
use crate::ffmpeg::{output_path, Encoder};
use crate::filelistitem::file_name_of;

pub const STOPPED_MARKER: &str = "Conversion stopped by user.";

#[derive(Clone, Debug)]
pub enum BatchMessage {
    Started { total: usize },
    FileStarted { index: usize, path: PathBuf },
    FileConverted { path: PathBuf },
    FileFailed { index: usize, path: PathBuf, reason: String },
    Progress(u8),
    Finished(BatchReport),
}

/// Runs one batch at a time on a background thread and publishes what it
/// does to its subscribers. Stopping is cooperative: the flag is checked
/// between files only.
pub struct BatchProcessor<E: Encoder + Send + Sync + 'static> {
    encoder: Arc<E>,
    output_dir: Option<PathBuf>,
    stop: Arc<AtomicBool>,
    status: Arc<Mutex<BatchStatus>>,
    subscribers: Vec<Sender<BatchMessage>>,
}

impl<E: Encoder + Send + Sync + 'static> BatchProcessor<E> {
    pub fn new(encoder: E, output_dir: Option<PathBuf>) -> Self {
        BatchProcessor {
            encoder: Arc::new(encoder),
            output_dir,
            stop: Arc::new(AtomicBool::new(false)),
            status: Arc::new(Mutex::new(BatchStatus::Idle)),
            subscribers: vec![],
        }
    }

    pub fn subscribe(&mut self) -> Receiver<BatchMessage> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.push(tx);
        rx
    }

    /// Shared with signal handlers; setting it requests a stop.
    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    /// Spawns the worker. Fails if a batch is already running.
    pub fn start(&self, files: Vec<PathBuf>) -> Result<JoinHandle<BatchReport>, DriverError> {
        let guard = RunningGuard::acquire(&self.status)?;
        self.stop.store(false, Ordering::SeqCst);

        let run = self.batch_run();
        Ok(thread::spawn(move || {
            let report = run.process(&files);
            drop(guard);
            run.publish(BatchMessage::Finished(report.clone()));
            report
        }))
    }

    fn batch_run(&self) -> BatchRun<E> {
        BatchRun {
            encoder: Arc::clone(&self.encoder),
            output_dir: self.output_dir.clone(),
            stop: Arc::clone(&self.stop),
            subscribers: self.subscribers.clone(),
        }
    }
}

struct BatchRun<E: Encoder> {
    encoder: Arc<E>,
    output_dir: Option<PathBuf>,
    stop: Arc<AtomicBool>,
    subscribers: Vec<Sender<BatchMessage>>,
}

impl<E: Encoder> BatchRun<E> {
    fn publish(&self, msg: BatchMessage) {
        for tx in &self.subscribers {
            let _ = tx.send(msg.clone());
        }
    }

    fn should_stop(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }

    fn process(&self, files: &[PathBuf]) -> BatchReport {
        let total = files.len();
        let mut report = BatchReport::new();
        self.publish(BatchMessage::Started { total });

        if total == 0 {
            report.progress = progress_percent(0, 0);
            self.publish(BatchMessage::Progress(report.progress));
            return report;
        }

        for (index, path) in files.iter().enumerate() {
            if self.should_stop() {
                tracing::info!("stop requested before {:?}", path);
                report.log.push_str(STOPPED_MARKER);
                report.log.push('\n');
                report.outcome = BatchOutcome::StoppedByUser;
                break;
            }

            self.process_file(index, path, &mut report);

            report.progress = progress_percent(index + 1, total);
            self.publish(BatchMessage::Progress(report.progress));
        }

        report
    }

    fn process_file(&self, index: usize, path: &Path, report: &mut BatchReport) {
        let file_name = file_name_of(path);
        let destination = output_path(path, self.output_dir.as_deref());
        self.publish(BatchMessage::FileStarted { index, path: path.to_path_buf() });

        match self.encoder.encode(path, &destination) {
            Ok(text) => {
                report.log.push_str(&format!("--- {} ---\n{}\n", file_name, text));
                report.succeeded += 1;
                self.publish(BatchMessage::FileConverted { path: path.to_path_buf() });
            },
            Err(err) => {
                tracing::warn!("{}", err);
                report.log.push_str(&format!("--- ERROR: {} ---\n{}\n", file_name, err.log_text()));
                report.failed.push(path.to_path_buf());
                self.publish(BatchMessage::FileFailed {
                    index,
                    path: path.to_path_buf(),
                    reason: err.to_string(),
                });
            },
        }
    }
}

/// Holds the processor in `Running`; dropping it returns it to `Idle`.
struct RunningGuard {
    status: Arc<Mutex<BatchStatus>>,
}

impl RunningGuard {
    fn acquire(status: &Arc<Mutex<BatchStatus>>) -> Result<Self, DriverError> {
        let mut s = lock_status(status);
        if *s == BatchStatus::Running {
            return Err(DriverError::AlreadyRunning);
        }
        *s = BatchStatus::Running;
        Ok(RunningGuard { status: Arc::clone(status) })
    }
}

impl Drop for RunningGuard {
    fn drop(&mut self) {
        *lock_status(&self.status) = BatchStatus::Idle;
    }
}

fn lock_status(status: &Mutex<BatchStatus>) -> std::sync::MutexGuard<'_, BatchStatus> {
    // a poisoned lock still holds a valid status
    status.lock().unwrap_or_else(|e| e.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EncodeError;
    use std::sync::mpsc::RecvTimeoutError;
    use std::time::Duration;

    /// Succeeds unless the file name is in `failing`; can raise the stop
    /// flag once a given file has been encoded.
    struct FakeEncoder {
        failing: Vec<String>,
        unlaunchable: Vec<String>,
        calls: Mutex<Vec<(PathBuf, PathBuf)>>,
        stop_after: Option<(String, Arc<AtomicBool>)>,
    }

    impl FakeEncoder {
        fn new(failing: &[&str]) -> Self {
            FakeEncoder {
                failing: failing.iter().map(|s| s.to_string()).collect(),
                unlaunchable: vec![],
                calls: Mutex::new(vec![]),
                stop_after: None,
            }
        }
    }

    impl Encoder for Arc<FakeEncoder> {
        fn encode(&self, input: &Path, output: &Path) -> Result<String, EncodeError> {
            self.calls.lock().unwrap().push((input.to_path_buf(), output.to_path_buf()));
            let name = file_name_of(input);
            if let Some((after, flag)) = &self.stop_after {
                if *after == name {
                    flag.store(true, Ordering::SeqCst);
                }
            }
            if self.unlaunchable.contains(&name) {
                return Err(EncodeError::Launch {
                    program: PathBuf::from("ffmpeg"),
                    path: input.to_path_buf(),
                    source: std::io::Error::new(std::io::ErrorKind::NotFound, "No such file or directory"),
                });
            }
            if self.failing.contains(&name) {
                Err(EncodeError::Failed {
                    path: input.to_path_buf(),
                    code: Some(1),
                    output: format!("{}: Invalid data found when processing input\n", name),
                })
            } else {
                Ok(format!("encoded {}\n", name))
            }
        }
    }

    fn paths(names: &[&str]) -> Vec<PathBuf> {
        names.iter().map(|n| PathBuf::from(format!("/in/{}", n))).collect()
    }

    fn run_batch<E: Encoder + Send + Sync + 'static>(processor: &BatchProcessor<E>, files: Vec<PathBuf>) -> BatchReport {
        processor.start(files).unwrap().join().unwrap()
    }

    fn drain(rx: &Receiver<BatchMessage>) -> Vec<BatchMessage> {
        rx.try_iter().collect()
    }

    fn progress_values(msgs: &[BatchMessage]) -> Vec<u8> {
        msgs.iter().filter_map(|m| match m {
            BatchMessage::Progress(p) => Some(*p),
            _ => None,
        }).collect()
    }

    #[test]
    fn test_all_succeed() {
        let fake = Arc::new(FakeEncoder::new(&[]));
        let mut processor = BatchProcessor::new(Arc::clone(&fake), Some(PathBuf::from("/out")));
        let rx = processor.subscribe();

        let report = run_batch(&processor, paths(&["a.mkv", "b.mp4", "c.MP4"]));
        assert_eq!(report.outcome, BatchOutcome::Completed);
        assert_eq!(report.progress, 100);
        assert_eq!(report.succeeded, 3);
        assert!(report.failed.is_empty());
        assert_eq!(report.log.matches("--- ERROR:").count(), 0);
        assert_eq!(report.log.matches("\n--- ").count() + 1, 3);
        assert!(report.log.starts_with("--- a.mkv ---\nencoded a.mkv\n"));

        let msgs = drain(&rx);
        assert_eq!(progress_values(&msgs), vec![33, 67, 100]);
        assert!(matches!(msgs.first(), Some(BatchMessage::Started { total: 3 })));
        assert!(matches!(msgs.last(), Some(BatchMessage::Finished(_))));

        let calls = fake.calls.lock().unwrap();
        assert_eq!(calls[0], (PathBuf::from("/in/a.mkv"), PathBuf::from("/out/converted_a.mkv")));
        assert_eq!(calls[2].1, PathBuf::from("/out/converted_c.MP4"));
    }

    #[test]
    fn test_output_defaults_to_source_directory() {
        let fake = Arc::new(FakeEncoder::new(&[]));
        let processor = BatchProcessor::new(Arc::clone(&fake), None);
        run_batch(&processor, vec![PathBuf::from("/videos/movie.mp4")]);
        assert_eq!(fake.calls.lock().unwrap()[0].1, PathBuf::from("/videos/converted_movie.mp4"));
    }

    #[test]
    fn test_failure_does_not_halt_batch() {
        let fake = Arc::new(FakeEncoder::new(&["b.mkv"]));
        let mut processor = BatchProcessor::new(Arc::clone(&fake), None);
        let rx = processor.subscribe();

        let report = run_batch(&processor, paths(&["a.mkv", "b.mkv", "c.mkv"]));
        assert_eq!(report.outcome, BatchOutcome::Completed);
        assert_eq!(report.progress, 100);
        assert_eq!(report.succeeded, 2);
        assert_eq!(report.failed, vec![PathBuf::from("/in/b.mkv")]);
        assert!(report.log.contains("--- a.mkv ---"));
        assert!(report.log.contains("--- ERROR: b.mkv ---\nb.mkv: Invalid data found"));
        assert!(report.log.contains("--- c.mkv ---"));
        assert_eq!(report.log.matches("--- ERROR:").count(), 1);

        let failures: Vec<(usize, PathBuf)> = drain(&rx).into_iter().filter_map(|m| match m {
            BatchMessage::FileFailed { index, path, .. } => Some((index, path)),
            _ => None,
        }).collect();
        assert_eq!(failures, vec![(1, PathBuf::from("/in/b.mkv"))]);
        assert_eq!(fake.calls.lock().unwrap().len(), 3);
    }

    #[test]
    fn test_launch_failure_does_not_halt_batch() {
        let mut fake = FakeEncoder::new(&[]);
        fake.unlaunchable.push(String::from("a.mkv"));
        let fake = Arc::new(fake);
        let mut processor = BatchProcessor::new(Arc::clone(&fake), None);
        let rx = processor.subscribe();

        let report = run_batch(&processor, paths(&["a.mkv", "b.mkv"]));
        assert_eq!(report.outcome, BatchOutcome::Completed);
        assert_eq!(report.progress, 100);
        assert_eq!(report.succeeded, 1);
        assert_eq!(report.failed, vec![PathBuf::from("/in/a.mkv")]);
        assert!(report.log.starts_with("--- ERROR: a.mkv ---\nUnable to launch \"ffmpeg\""));
        assert!(report.log.contains("--- b.mkv ---\nencoded b.mkv\n"));
        assert_eq!(fake.calls.lock().unwrap().len(), 2);

        let msgs = drain(&rx);
        assert!(msgs.iter().any(|m| matches!(m, BatchMessage::FileFailed { index: 0, reason, .. } if reason.starts_with("Unable to launch"))));
        assert_eq!(progress_values(&msgs), vec![50, 100]);
    }

    #[test]
    fn test_stop_before_file() {
        let mut fake = FakeEncoder::new(&[]);
        let stop = Arc::new(AtomicBool::new(false));
        fake.stop_after = Some((String::from("b.mkv"), Arc::clone(&stop)));
        let fake = Arc::new(fake);

        let mut processor = BatchProcessor::new(Arc::clone(&fake), None);
        processor.stop = stop;
        let rx = processor.subscribe();

        let report = run_batch(&processor, paths(&["a.mkv", "b.mkv", "c.mkv", "d.mkv"]));
        assert_eq!(report.outcome, BatchOutcome::StoppedByUser);
        assert_eq!(report.progress, 50);
        assert_eq!(report.succeeded, 2);
        assert!(report.log.ends_with("Conversion stopped by user.\n"));
        assert!(!report.log.contains("c.mkv"));
        assert_eq!(fake.calls.lock().unwrap().len(), 2);
        assert_eq!(progress_values(&drain(&rx)), vec![25, 50]);
    }

    #[test]
    fn test_stop_requested_during_last_file_completes() {
        let mut fake = FakeEncoder::new(&[]);
        let stop = Arc::new(AtomicBool::new(false));
        fake.stop_after = Some((String::from("b.mkv"), Arc::clone(&stop)));

        let mut processor = BatchProcessor::new(Arc::new(fake), None);
        processor.stop = stop;
        let report = run_batch(&processor, paths(&["a.mkv", "b.mkv"]));
        assert_eq!(report.outcome, BatchOutcome::Completed);
        assert!(!report.log.contains(STOPPED_MARKER));
    }

    #[test]
    fn test_empty_batch_completes() {
        let mut processor = BatchProcessor::new(Arc::new(FakeEncoder::new(&[])), None);
        let rx = processor.subscribe();
        let report = run_batch(&processor, vec![]);
        assert_eq!(report.outcome, BatchOutcome::Completed);
        assert_eq!(report.progress, 100);
        assert!(report.log.is_empty());
        assert_eq!(progress_values(&drain(&rx)), vec![100]);
    }

    #[test]
    fn test_stop_flag_is_reset_on_start() {
        let processor = BatchProcessor::new(Arc::new(FakeEncoder::new(&[])), None);
        processor.stop_flag().store(true, Ordering::SeqCst);
        let report = run_batch(&processor, paths(&["a.mkv"]));
        assert_eq!(report.outcome, BatchOutcome::Completed);
    }

    /// Blocks every encode until released.
    struct GatedEncoder {
        gate: Mutex<Receiver<()>>,
    }

    impl Encoder for GatedEncoder {
        fn encode(&self, _input: &Path, _output: &Path) -> Result<String, EncodeError> {
            let _ = self.gate.lock().unwrap().recv();
            Ok(String::new())
        }
    }

    #[test]
    fn test_second_start_is_rejected_while_running() {
        let (release, gate) = mpsc::channel();
        let mut processor = BatchProcessor::new(GatedEncoder { gate: Mutex::new(gate) }, None);
        let rx = processor.subscribe();

        let handle = processor.start(paths(&["a.mkv"])).unwrap();
        match rx.recv_timeout(Duration::from_secs(5)) {
            Ok(BatchMessage::Started { total: 1 }) => (),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(processor.start(paths(&["b.mkv"])).err(), Some(DriverError::AlreadyRunning));

        release.send(()).unwrap();
        let report = handle.join().unwrap();
        assert_eq!(report.succeeded, 1);

        let finished = loop {
            match rx.recv_timeout(Duration::from_secs(5)) {
                Ok(BatchMessage::Finished(report)) => break report,
                Ok(_) => continue,
                Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => panic!("no Finished message"),
            }
        };
        assert_eq!(finished.progress, 100);

        release.send(()).unwrap();
        assert!(processor.start(paths(&["c.mkv"])).unwrap().join().is_ok());
    }
}
