//! Parentkey CLI - repair the Parent Key column of Jira CSV exports
//!
//! ```bash
//! parentkey process export.csv            # Write processed_jira_export.csv
//! parentkey process export.csv -o out.csv # Choose the output path
//! parentkey preview export.csv --original # Show the first original rows
//! parentkey serve --port 3000             # Start the HTTP upload server
//! ```

use clap::{Parser, Subcommand};
use parentkey::{process_file, serialize, ProcessOptions, DOWNLOAD_FILE_NAME};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Parser)]
#[command(name = "parentkey")]
#[command(about = "Rewrite the Parent Key column of a Jira CSV export", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Process a CSV export and write the result
    Process {
        /// Input CSV file
        input: PathBuf,

        /// Output file (default: processed_jira_export.csv)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Pause before publishing the result, in milliseconds
        #[arg(long)]
        delay_ms: Option<u64>,
    },

    /// Print the first rows of the processed (or original) data
    Preview {
        /// Input CSV file
        input: PathBuf,

        /// Number of rows to show
        #[arg(short, long, default_value = "5")]
        rows: usize,

        /// Show the original rows instead of the processed ones
        #[arg(long)]
        original: bool,
    },

    /// Start HTTP server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "3000")]
        port: u16,
    },
}

#[tokio::main]
async fn main() {
    // Load .env file (if present)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let options = ProcessOptions::from_env();

    let result = match cli.command {
        Commands::Process {
            input,
            output,
            delay_ms,
        } => {
            let options = match delay_ms {
                Some(ms) => options.with_delay(Duration::from_millis(ms)),
                None => options,
            };
            cmd_process(&input, output.as_deref(), &options).await
        }

        Commands::Preview {
            input,
            rows,
            original,
        } => cmd_preview(&input, rows, original).await,

        Commands::Serve { port } => cmd_serve(port, options).await,
    };

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

async fn cmd_process(
    input: &Path,
    output: Option<&Path>,
    options: &ProcessOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("📄 Processing: {}", input.display());

    let result = process_file(input, options).await?;

    eprintln!("   Rows: {}", result.row_count());
    eprintln!("   Columns: {}", result.original.headers.join(", "));
    eprintln!("   Parent Key changed: {}", result.flagged_count());

    let artifact = serialize(&result)?;
    let path = output.unwrap_or_else(|| Path::new(DOWNLOAD_FILE_NAME));
    fs::write(path, &artifact.bytes)?;
    eprintln!("💾 Output written to: {}", path.display());

    eprintln!("\n✨ Done!");
    Ok(())
}

async fn cmd_preview(
    input: &Path,
    rows: usize,
    original: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let result = process_file(input, &ProcessOptions::immediate()).await?;

    let preview = if original {
        result.original_preview(rows)
    } else {
        result.preview(rows)
    };
    println!("{}", preview.render());
    Ok(())
}

async fn cmd_serve(port: u16, options: ProcessOptions) -> Result<(), Box<dyn std::error::Error>> {
    parentkey::server::start_server(port, options).await?;
    Ok(())
}
