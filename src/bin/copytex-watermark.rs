use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use copytex_watermark::{
    bridge, default_output_path, load_alpha_maps, logging, AlphaMapSlot, Config, DirAssetLoader,
    Fetch, FetchRequest, LogoSize, ProcessOptions, ProcessResult, ReqwestFetch, WatermarkEngine,
    WatermarkInterceptor,
};

#[derive(Parser)]
#[command(
    name = "copytex-watermark",
    about = "Remove the visible Gemini logo overlay via reverse alpha blending",
    version,
    after_help = "NOTE: This tool only removes the VISIBLE Gemini watermark (star/sparkle logo).\n\
                  It cannot remove SynthID (invisible watermark)."
)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding bg_48.png and bg_96.png (overrides the config)
    #[arg(long, global = true)]
    assets: Option<PathBuf>,

    /// Suppress all non-error output
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Clean an image file or a directory of images
    Clean {
        /// Input image file or directory
        input: PathBuf,

        /// Output file or directory (default: {name}_cleaned.{ext})
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Force 48x48 watermark size
        #[arg(long, conflicts_with = "force_large")]
        force_small: bool,

        /// Force 96x96 watermark size
        #[arg(long)]
        force_large: bool,
    },
    /// Fetch an image URL through the interceptor and save the result
    Fetch {
        /// Image URL
        url: String,

        /// Output file
        #[arg(short, long)]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("Error: {e:#}");
            process::exit(1);
        }
    }
}

async fn run(cli: Cli) -> Result<i32> {
    let mut config = match &cli.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => Config::default(),
    };
    if let Some(dir) = &cli.assets {
        config.assets.dir.clone_from(dir);
    }

    let filter = if cli.quiet { "error" } else { config.logging.filter.as_str() };
    logging::init(filter);

    let loader = DirAssetLoader::new(&config.assets.dir);
    let maps = load_alpha_maps(&loader, &config.assets)
        .await
        .context("failed to initialize engine")?;

    match cli.command {
        Command::Clean {
            input,
            output,
            force_small,
            force_large,
        } => {
            let force_size = if force_small {
                Some(LogoSize::Small)
            } else if force_large {
                Some(LogoSize::Large)
            } else {
                None
            };
            let engine = WatermarkEngine::new(Arc::new(maps));
            let opts = ProcessOptions { force_size };
            clean(&engine, &input, output, &opts, cli.quiet)
        }
        Command::Fetch { url, output } => {
            let (sender, receiver) = bridge::channel();
            sender.broadcast(&maps)?;
            let slot = AlphaMapSlot::default();
            receiver.listen(slot.clone()).await;

            let interceptor = WatermarkInterceptor::new(ReqwestFetch::default(), slot);
            let response = interceptor.fetch(FetchRequest::get(&url)).await?;
            if !response.is_ok() {
                bail!("{} returned {} {}", url, response.status, response.status_text);
            }
            std::fs::write(&output, &response.body)
                .with_context(|| format!("failed to write {}", output.display()))?;
            info!(bytes = response.body.len(), output = %output.display(), "saved");
            Ok(0)
        }
    }
}

fn clean(
    engine: &WatermarkEngine,
    input: &Path,
    output: Option<PathBuf>,
    opts: &ProcessOptions,
    quiet: bool,
) -> Result<i32> {
    if !input.exists() {
        bail!("input path does not exist: {}", input.display());
    }

    let results = if input.is_dir() {
        let Some(output_dir) = output else {
            bail!(
                "output directory is required for batch processing\n\
                 Usage: copytex-watermark clean <input_dir> -o <output_dir>"
            );
        };
        engine.process_directory(input, &output_dir, opts)
    } else {
        let output_path = output.unwrap_or_else(|| default_output_path(input));
        vec![engine.process_file(input, &output_path, opts)]
    };

    let mut success_count = 0u32;
    let mut skip_count = 0u32;
    let mut fail_count = 0u32;

    for r in &results {
        print_result(r, quiet);
        if r.skipped {
            skip_count += 1;
        } else if r.success {
            success_count += 1;
        } else {
            fail_count += 1;
        }
    }

    if results.len() > 1 && !quiet {
        eprintln!();
        eprint!("[Summary] Processed: {success_count}");
        if skip_count > 0 {
            eprint!(", Skipped: {skip_count}");
        }
        if fail_count > 0 {
            eprint!(", Failed: {fail_count}");
        }
        eprintln!(" (Total: {})", results.len());
    }

    Ok(i32::from(fail_count > 0))
}

fn print_result(result: &ProcessResult, quiet: bool) {
    let filename = result.path.file_name().map_or_else(
        || result.path.display().to_string(),
        |f| f.to_string_lossy().to_string(),
    );

    if result.skipped {
        if !quiet {
            eprintln!("[SKIP] {filename}: {}", result.message);
        }
    } else if result.success {
        if !quiet {
            eprintln!("[OK] {filename}");
        }
    } else {
        eprintln!("[FAIL] {filename}: {}", result.message);
    }
}
