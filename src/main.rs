use std::path::PathBuf;

use clap::Parser;
use log::LevelFilter;

use convert_doc::{Config, convert};

#[derive(Parser)]
#[command(name = "convert-doc")]
#[command(about = "Convert Markdown files to Word documents with template styling")]
#[command(after_help = EXIT_CODES)]
struct Cli {
    /// Input Markdown file
    input: PathBuf,

    /// Word template (.docx) supplying the style catalog
    #[arg(short, long)]
    template: Option<PathBuf>,

    /// Output file (defaults to <input stem>_converted.docx beside the input)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Appearance config (defaults to convert-doc.toml beside the input)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose progress output
    #[arg(short, long)]
    verbose: bool,
}

const EXIT_CODES: &str = "Exit codes:
  0  success
  1  input file not found
  2  input file unreadable
  3  template unreadable
  4  translation failure
  5  output not writable";

fn main() {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(if cli.verbose {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        })
        .format_timestamp(None)
        .init();

    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| cli.input.with_file_name("convert-doc.toml"));
    let config = Config::load(&config_path);

    match convert(
        &cli.input,
        cli.template.as_deref(),
        cli.output.as_deref(),
        &config,
    ) {
        Ok(result) => {
            if result.degraded > 0 {
                println!(
                    "Created {} ({} blocks, {} degraded)",
                    result.output.display(),
                    result.blocks,
                    result.degraded
                );
            } else {
                println!(
                    "Created {} ({} blocks)",
                    result.output.display(),
                    result.blocks
                );
            }
        }
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(e.exit_code());
        }
    }
}
