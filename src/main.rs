use fdstats::processor;

use anyhow::Result;
use clap::Parser;
use std::io::Write;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "fdstats")]
#[command(about = "Parse strace output files and summarize per-fd usage", long_about = None)]
struct Args {
    /// Emit each report as JSON instead of text
    #[arg(short, long)]
    json: bool,

    /// Input trace files
    files: Vec<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    if args.files.is_empty() {
        eprintln!("Error: No input files specified");
        std::process::exit(1);
    }

    for path in &args.files {
        let (report, stats) = processor::process_file(path)?;

        for warning in &report.warnings {
            eprintln!("warning: {warning}");
        }

        let stdout = std::io::stdout();
        let mut out = stdout.lock();
        if args.json {
            serde_json::to_writer_pretty(&mut out, &report)?;
            writeln!(out)?;
        } else {
            report.write_text(&mut out)?;
            writeln!(
                out,
                "Lines: {} total, {} processed, {} skipped",
                stats.total_lines, stats.processed_lines, stats.skipped_lines
            )?;
        }
    }

    Ok(())
}
