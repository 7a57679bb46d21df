pub mod app;
pub mod batch_processor;
pub mod batch_state;
pub mod codecs;
pub mod error;
pub mod ffmpeg;
pub mod filelist;
pub mod filelistitem;
pub mod filescanner;
pub mod fstools;
pub mod settings;

use std::path::PathBuf;
use std::process::ExitCode;

use rustop::opts;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use app::{App, AppOptions};
use codecs::AudioCodec;
use settings::SettingsStore;

fn main() -> ExitCode {
    let (args, _rest) = opts! {
        synopsis "Re-encode the audio of .mp4/.mkv files to a lossless codec, copying the video.";
        opt output:Option<String>, desc:"Output directory (remembered; default: same as input).";
        opt reset_output:bool=false, desc:"Forget the output directory and write next to the inputs.";
        opt list:bool=false, desc:"Only list the files that would be converted.";
        opt show_logs:bool=false, desc:"Print the collected ffmpeg logs when done.";
        opt copy_logs:bool=false, desc:"Copy the collected ffmpeg logs to the clipboard when done.";
        opt log_file:Option<String>, desc:"Write the collected ffmpeg logs to this file.";
        opt settings:Option<String>, desc:"Settings file (default: ~/.flac_converter_settings.json).";
        opt ffmpeg:String=String::from("ffmpeg"), desc:"Encoder binary.";
        opt codec:String=String::from("flac"), desc:"Lossless audio codec. [flac, alac]";
        param directory:Option<String>, desc:"Input directory (remembered; default: last used).";
    }.parse_or_exit();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let codec = match AudioCodec::from_str(&args.codec) {
        Some(codec) => codec,
        None => {
            println!("Unsupported audio codec: {}.", args.codec);
            return ExitCode::FAILURE;
        },
    };

    let options = AppOptions {
        input: args.directory.map(PathBuf::from),
        output: args.output.map(PathBuf::from),
        reset_output: args.reset_output,
        list_only: args.list,
        show_logs: args.show_logs,
        copy_logs: args.copy_logs,
        log_file: args.log_file.map(PathBuf::from),
        settings_path: args.settings.map(PathBuf::from).unwrap_or_else(SettingsStore::default_path),
        ffmpeg: PathBuf::from(&args.ffmpeg),
        codec,
    };

    match App::new(options).run() {
        Ok(None) => ExitCode::SUCCESS,
        Ok(Some(report)) => match report.failed.is_empty() {
            true => ExitCode::SUCCESS,
            false => {
                for path in &report.failed {
                    println!("Failed to convert {}", path.display());
                }
                ExitCode::FAILURE
            },
        },
        Err(err) => {
            println!("{}", err);
            ExitCode::FAILURE
        },
    }
}
