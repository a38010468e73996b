use clap::{Parser, Subcommand};
use magick_interop::{config, generate, output, scan};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

fn version_string() -> &'static str {
    let on_tag = env!("ON_RELEASE_TAG");
    if on_tag == "true" {
        env!("CARGO_PKG_VERSION")
    } else {
        let hash = env!("GIT_HASH");
        if hash.is_empty() {
            "dev@unknown"
        } else {
            // Leaked once at startup
            Box::leak(format!("dev@{hash}").into_boxed_str())
        }
    }
}

#[derive(Parser)]
#[command(name = "magick-interop")]
#[command(about = "Interop code generator for the ImageMagick .NET binding")]
#[command(long_about = "\
Interop code generator for the ImageMagick .NET binding

Reads one descriptor per native class and emits the P/Invoke glue: extern
declarations per architecture, marshaling, exception checks, and the private
wrapper owning the native handle.

Descriptor structure:

  descriptors/
  ├── interop.toml                 # Generator config (optional)
  ├── MagickImage.toml             # One class per file
  ├── MagickFormatInfo.json        # TOML or JSON
  └── Settings/                    # Subdirectories mirror into the output
      └── MagickSettings.toml

Output:

  generated/
  ├── MagickImage.cs
  ├── Settings/MagickSettings.cs
  └── MagickExceptionHelper.g.cs   # Severity dispatch (optional)

Run 'magick-interop gen-config' to generate a documented interop.toml.")]
#[command(version = version_string())]
struct Cli {
    /// Descriptor directory
    #[arg(long, default_value = "descriptors", global = true)]
    source: PathBuf,

    /// Output directory for generated C#
    #[arg(long, default_value = "generated", global = true)]
    output: PathBuf,

    /// Directory for intermediate files (manifest)
    #[arg(long, default_value = ".magick-interop-temp", global = true)]
    temp_dir: PathBuf,

    /// Disable the generation cache and rewrite every file
    #[arg(long, global = true)]
    no_cache: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Scan descriptors into a manifest
    Scan,
    /// Generate C# from the scanned manifest
    Generate,
    /// Run the full pipeline: scan → generate
    Build,
    /// Validate descriptors without generating
    Check,
    /// Print a stock interop.toml with all options documented
    GenConfig,
    /// Show the exception kind a native severity code maps to
    Severity {
        /// Native severity code, e.g. 425
        #[arg(allow_negative_numbers = true)]
        code: i32,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Command::Scan => {
            let manifest = scan::scan(&cli.source)?;
            write_manifest(&manifest, &cli.temp_dir)?;
            output::print_scan_output(&manifest);
        }
        Command::Generate => {
            let manifest = generate::load_manifest(&cli.temp_dir.join("manifest.json"))?;
            run_generate(&manifest, &cli.output, !cli.no_cache)?;
        }
        Command::Build => {
            println!("==> Stage 1: Scanning {}", cli.source.display());
            let manifest = scan::scan(&cli.source)?;
            write_manifest(&manifest, &cli.temp_dir)?;
            output::print_scan_output(&manifest);

            println!("==> Stage 2: Generating C# → {}", cli.output.display());
            run_generate(&manifest, &cli.output, !cli.no_cache)?;

            println!("==> Build complete: {}", cli.output.display());
        }
        Command::Check => {
            println!("==> Checking {}", cli.source.display());
            let manifest = scan::scan(&cli.source)?;
            output::print_scan_output(&manifest);
            println!("==> Descriptors are valid");
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
        Command::Severity { code } => {
            output::print_severity(code);
        }
    }

    Ok(())
}

/// Logs go to stderr so stdout stays parseable. `RUST_LOG` wins over `-v`.
fn init_logging(verbose: u8) {
    use tracing_subscriber::EnvFilter;

    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("magick_interop={level}")));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .compact()
        .try_init()
        .ok();
}

fn write_manifest(manifest: &scan::Manifest, temp_dir: &Path) -> Result<(), Box<dyn std::error::Error>> {
    std::fs::create_dir_all(temp_dir)?;
    let json = serde_json::to_string_pretty(manifest)?;
    std::fs::write(temp_dir.join("manifest.json"), json)?;
    Ok(())
}

fn run_generate(
    manifest: &scan::Manifest,
    output_dir: &Path,
    use_cache: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let (tx, rx) = std::sync::mpsc::channel();
    let printer = std::thread::spawn(move || {
        for event in rx {
            for line in output::format_generate_event(&event) {
                println!("{}", line);
            }
        }
    });
    let result = generate::generate(manifest, output_dir, use_cache, Some(tx));
    printer.join().ok();
    let result = result?;
    println!("Cache: {}", result.cache_stats);
    Ok(())
}
