use annotate::{ExtractionConfig, PixelStats, SegmentationImage, extract_annotations, extract_batch};
use clap::{Args, Parser, Subcommand};
use cli::{OutputFormat, list_images, load_config, output_path_for};
use color_eyre::eyre::{Result, eyre};
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};
use tracing_subscriber::{self, EnvFilter};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Flags shared by the extraction commands; they override the config file.
#[derive(Args)]
struct ExtractionArgs {
    /// Path to a .toml or .json extraction config
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Attach run-length encoded masks
    #[arg(long)]
    rle: bool,
    /// Attach coordinates normalized to the image size
    #[arg(long)]
    float: bool,
    /// Skip the closing pass after the opening pass
    #[arg(long)]
    keep_salt: bool,
    /// Maximum number of distinct colors, background included
    #[arg(long)]
    max_categories: Option<usize>,
    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
    format: OutputFormat,
}

impl ExtractionArgs {
    fn resolve(&self) -> Result<ExtractionConfig> {
        let mut config = match &self.config {
            Some(path) => load_config(path)?,
            None => ExtractionConfig::default(),
        };
        config.rle_segmentations |= self.rle;
        config.float_annotations |= self.float;
        if self.keep_salt {
            config.remove_salt = false;
        }
        if let Some(max) = self.max_categories {
            config.max_categories = max;
        }
        config.validate()?;
        Ok(config)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Extract annotations from one segmentation image
    Extract {
        /// Path to the segmentation image
        #[arg(short, long)]
        input: PathBuf,
        /// Where to write the result (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[command(flatten)]
        extraction: ExtractionArgs,
    },
    /// Extract every image of a directory in parallel
    Batch {
        /// Directory holding the segmentation images
        #[arg(short, long)]
        input_dir: PathBuf,
        /// Directory receiving one result file per image
        #[arg(short, long)]
        output_dir: PathBuf,
        #[command(flatten)]
        extraction: ExtractionArgs,
    },
    /// Per-channel mean and standard deviation over images
    Stats {
        /// Segmentation images to include
        #[arg(short, long, num_args = 1.., required = true)]
        input: Vec<PathBuf>,
    },
    /// Print the JSON schema of the extraction config
    Schema,
}

fn main() -> Result<()> {
    color_eyre::install()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info"))
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Extract { input, output, extraction } => {
            extract(input, output.as_deref(), extraction)?;
        }
        Commands::Batch { input_dir, output_dir, extraction } => {
            batch(input_dir, output_dir, extraction)?;
        }
        Commands::Stats { input } => {
            stats(input)?;
        }
        Commands::Schema => {
            println!("{}", serde_json::to_string_pretty(&ExtractionConfig::schema())?);
        }
    }

    Ok(())
}

fn load_image(path: &Path) -> Result<SegmentationImage> {
    let decoded = image::open(path)?;
    Ok(SegmentationImage::from_dynamic(&decoded)?)
}

fn extract(input: &Path, output: Option<&Path>, args: &ExtractionArgs) -> Result<()> {
    let config = args.resolve()?;
    let image = load_image(input)?;
    info!("Input image: {:?} ({}x{})", input, image.width(), image.height());

    let set = extract_annotations(&image, &config)?;
    let text = args.format.render(&set)?;

    match output {
        Some(path) => {
            std::fs::write(path, text)?;
            info!("✅ Wrote {} annotations to {:?}", set.len(), path);
        }
        None => println!("{text}"),
    }
    Ok(())
}

fn batch(input_dir: &Path, output_dir: &Path, args: &ExtractionArgs) -> Result<()> {
    let config = args.resolve()?;
    let paths = list_images(input_dir)?;
    if paths.is_empty() {
        return Err(eyre!("No images found in {:?}", input_dir));
    }

    // Create output directory if it doesn't exist
    std::fs::create_dir_all(output_dir)?;

    let mut loaded = Vec::with_capacity(paths.len());
    let mut images = Vec::with_capacity(paths.len());
    for path in paths {
        match load_image(&path) {
            Ok(image) => {
                images.push(image);
                loaded.push(path);
            }
            Err(e) => warn!("Skipping {:?}: {}", path, e),
        }
    }
    info!("Extracting annotations from {} images", images.len());

    let mut failures = 0;
    for (path, result) in loaded.iter().zip(extract_batch(&images, &config)) {
        match result {
            Ok(set) => {
                let target = output_path_for(path, output_dir, args.format);
                std::fs::write(&target, args.format.render(&set)?)?;
                info!("{:?} -> {:?} ({} annotations)", path, target, set.len());
            }
            Err(e) => {
                failures += 1;
                error!("Failed to process {:?}: {}", path, e);
            }
        }
    }

    info!("✅ Batch completed: {} ok, {} failed", loaded.len() - failures, failures);
    Ok(())
}

fn stats(inputs: &[PathBuf]) -> Result<()> {
    let images = inputs
        .iter()
        .map(|path| load_image(path))
        .collect::<Result<Vec<_>>>()?;
    let stats = PixelStats::from_images(&images)?;
    println!("{}", serde_json::to_string_pretty(&stats)?);
    Ok(())
}
