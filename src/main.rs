use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use log::info;

use flate_rs::gzip::decompress_buffered;

/// Decompress a single gzip-format file.
#[derive(Debug, Parser)]
#[command(name = "gunzip", about = "Decompress a gzip (.gz) file")]
struct Args {
    /// Path to the gzip-compressed input file.
    input: PathBuf,

    /// Write the decompressed output here instead of the name embedded in the gzip header.
    /// Pass `-` to write to stdout.
    #[arg(short, long)]
    output: Option<String>,

    /// Write the decompressed output to stdout, like `gzip -c`.
    #[arg(short = 'c', long)]
    stdout: bool,

    /// Increase logging verbosity (can be passed multiple times).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Print the gzip header's metadata (name, comment, mtime, ...) as JSON on stderr.
    #[arg(long)]
    header_json: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose);

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("gunzip: {err}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn run(args: &Args) -> flate_rs::Result<()> {
    let input_file = File::open(&args.input)?;
    let mut reader = BufReader::new(input_file);

    // The output destination depends on the header's FNAME field, so decompression has to happen
    // before the sink is finalized; buffer into memory first and write out once we know where.
    let mut decoded = Vec::new();
    let report = decompress_buffered(&mut reader, &mut decoded)?;
    info!(
        "decompressed {} bytes ({} -> {:?})",
        report.bytes_written, args.input.display(), report.header.name
    );
    if args.header_json {
        let json = serde_json::to_string_pretty(&report.header)
            .expect("GzipHeader has no non-serializable fields");
        eprintln!("{json}");
    }

    if args.stdout || args.output.as_deref() == Some("-") {
        let stdout = io::stdout();
        let mut handle = BufWriter::new(stdout.lock());
        handle.write_all(&decoded)?;
        return Ok(());
    }

    let output_path = match &args.output {
        Some(path) => PathBuf::from(path),
        None => output_path_for(&args.input, report.header.name.as_deref()),
    };
    let mut output_file = BufWriter::new(File::create(&output_path)?);
    output_file.write_all(&decoded)?;
    info!("wrote {}", output_path.display());
    Ok(())
}

/// Picks an output filename: the gzip header's embedded name if present, otherwise the input
/// path with a trailing `.gz` stripped, falling back to appending `.out`.
fn output_path_for(input: &Path, embedded_name: Option<&str>) -> PathBuf {
    if let Some(name) = embedded_name {
        return PathBuf::from(name);
    }
    match input.extension() {
        Some(ext) if ext == "gz" => input.with_extension(""),
        _ => {
            let mut path = input.as_os_str().to_owned();
            path.push(".out");
            PathBuf::from(path)
        }
    }
}
