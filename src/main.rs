use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;

use hashrename::prelude::*;

#[derive(Parser)]
#[command(name = "hashrename")]
#[command(about = "Rename image files to their content hash and remove exact duplicates", long_about = None)]
struct Cli {
    /// Directory containing the images
    directory: PathBuf,

    /// Digest algorithm used to identify file content
    #[arg(short, long, value_enum, default_value_t = HashAlgorithm::Md5)]
    algorithm: HashAlgorithm,

    /// Read buffer size in bytes
    #[arg(long, default_value_t = DEFAULT_BUFFER_SIZE as u64, value_parser = clap::value_parser!(u64).range(1..))]
    buffer_size: u64,

    /// Number of digest characters used in new file names
    #[arg(long, default_value_t = DEFAULT_PREFIX_LEN as u64, value_parser = clap::value_parser!(u64).range(1..=64))]
    prefix_len: u64,

    /// Compare file contents byte-for-byte before deleting a duplicate
    #[arg(long)]
    verify: bool,

    /// Log file the console output is mirrored to (appended)
    #[arg(long, default_value = DEFAULT_LOG_FILE)]
    log_file: PathBuf,

    /// Log to the console only
    #[arg(long)]
    no_log_file: bool,

    /// Write a report of every rename, removal and error
    #[arg(short, long)]
    report: Option<PathBuf>,

    /// Write the report as JSON (requires --report)
    #[arg(long, requires = "report")]
    json: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let log = RunLogger::new(&LogConfig {
        console: true,
        file: (!cli.no_log_file).then(|| cli.log_file.clone()),
        level: if cli.verbose { LevelFilter::DEBUG } else { LevelFilter::INFO },
    })?;

    if !cli.directory.is_dir() {
        log.error(format!("Directory '{}' does not exist", cli.directory.display()));
        return Ok(ExitCode::FAILURE);
    }

    let options = RenameOptions {
        prefix_len: cli.prefix_len as usize,
        verify: cli.verify,
    };
    let hasher = StreamHasher::new(cli.algorithm, cli.buffer_size as usize);

    log.info(format!("Processing directory: {}", cli.directory.display()));
    let report = rename_and_deduplicate(&cli.directory, &options, &hasher, &log)?;
    report.summary.log(&log);

    if let Some(ref report_path) = cli.report {
        let written = if cli.json {
            write_json_report(report_path, &report)
        } else {
            write_report(report_path, &report)
        };
        match written {
            Ok(()) => log.info(format!("Report saved to: {}", report_path.display())),
            Err(e) => log.error(format!("{:#}", e)),
        }
    }

    log.info("Processing complete");
    Ok(ExitCode::SUCCESS)
}
