use std::path::{Path, PathBuf};
use std::process;

use clap::Parser;
use env_logger::Env;

use gbk2utf8::convert::{self, ConvertOptions};
use gbk2utf8::error::{ConvertError, ConvertResult};

const DEFAULT_LOG_LEVEL: &str = "warn";

#[derive(Parser)]
#[command(
    name = "gbk2utf8",
    about = "Convert GBK coded file to UTF-8 coded.",
    version = env!("CARGO_PKG_VERSION")
)]
struct Cli {
    /// Convert file in place, do not save backup
    #[arg(short = 'i', long = "in-place")]
    in_place: bool,

    /// Overwrite the existing backup file if it exists
    #[arg(short = 'b', long = "backup-anyway")]
    backup_anyway: bool,

    /// File(s) to proceed
    #[arg(value_name = "FILES", required = true)]
    files: Vec<PathBuf>,
}

fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or(DEFAULT_LOG_LEVEL)).init();

    let cli = Cli::parse();
    let options = ConvertOptions {
        in_place: cli.in_place,
        backup_anyway: cli.backup_anyway,
    };

    let failed = convert::convert_all(&cli.files, options, |path, outcome| {
        eprintln!("{}", status_line(path, outcome));
    });

    if failed > 0 {
        log::info!("{failed} of {} file(s) failed", cli.files.len());
        process::exit(1);
    }
}

fn status_line(path: &Path, outcome: &ConvertResult<()>) -> String {
    let path = path.display();
    match outcome {
        Ok(()) => format!("Converted: \"{path}\""),
        Err(ConvertError::BackupExists(_)) => format!("Failed: Could not save backup: \"{path}\""),
        Err(ConvertError::NotFound(_)) => format!("Failed: Not found: \"{path}\""),
        Err(ConvertError::PermissionDenied(_)) => format!("Failed: Permission denied: \"{path}\""),
        Err(ConvertError::IsADirectory(_)) => format!("Failed: Input is a directory: \"{path}\""),
        Err(ConvertError::Decode(e)) => format!("Failed: Unable to decode as GBK: \"{path}\": {e}"),
        Err(ConvertError::Io(e)) => format!("Failed: {e}: \"{path}\""),
    }
}
