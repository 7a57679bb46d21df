use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

use crate::codecs::AudioCodec;
use crate::error::EncodeError;

const OUTPUT_PREFIX: &str = "converted_";

/// Re-encodes one file. Returns the combined stdout+stderr text on success.
pub trait Encoder {
    fn encode(&self, input: &Path, output: &Path) -> Result<String, EncodeError>;
}

pub struct FFmpeg {
    program: PathBuf,
    codec: AudioCodec,
}

impl FFmpeg {
    pub fn new(program: PathBuf, codec: AudioCodec) -> Self {
        FFmpeg { program, codec }
    }

    pub fn is_installed(&self) -> bool {
        let cmd = Command::new(&self.program)
            .arg("-version")
            .stdin(Stdio::null())
            .output();
        match cmd {
            Ok(output) => output.status.success(),
            Err(_) => false,
        }
    }

    fn build_args(&self, input: &Path, output: &Path) -> Vec<PathBuf> {
        fn pbs(s: &str) -> PathBuf { PathBuf::from(s) }

        vec![
            pbs("-i"), input.to_path_buf(),
            // video passes through untouched
            pbs("-c:v"), pbs("copy"),
            pbs("-c:a"), pbs(self.codec.ca_parameter()),
            pbs("-y"), output.to_path_buf(),
        ]
    }

    fn command(&self, input: &Path, output: &Path) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(self.build_args(input, output)).stdin(Stdio::null());

        // keep the terminal's Ctrl-C away from the file in flight
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            cmd.process_group(0);
        }

        cmd
    }
}

impl Encoder for FFmpeg {
    fn encode(&self, input: &Path, output: &Path) -> Result<String, EncodeError> {
        tracing::info!("{:?} {:?}", self.program, self.build_args(input, output));
        let result = self.command(input, output).output().map_err(|source| EncodeError::Launch {
            program: self.program.clone(),
            path: input.to_path_buf(),
            source,
        })?;

        let text = combined_output(&result);
        match result.status.success() {
            true => Ok(text),
            false => Err(EncodeError::Failed {
                path: input.to_path_buf(),
                code: result.status.code(),
                output: text,
            }),
        }
    }
}

/// `<output_dir>/converted_<name>`, or next to `input` when no output directory is set.
/// The original name's bytes are kept as they are.
pub fn output_path(input: &Path, output_dir: Option<&Path>) -> PathBuf {
    let mut name = OsString::from(OUTPUT_PREFIX);
    match input.file_name() {
        Some(file_name) => name.push(file_name),
        None => name.push(input.as_os_str()),
    };
    let dir = match output_dir {
        Some(dir) => dir.to_path_buf(),
        None => input.parent().map(Path::to_path_buf).unwrap_or_default(),
    };
    dir.join(name)
}

fn combined_output(output: &Output) -> String {
    format!(
        "{}{}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr))
}
