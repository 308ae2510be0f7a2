use std::path::PathBuf;

use clap::{Parser, Subcommand};
use image::ImageReader;
use tracing::{info, Level};

use blm_annotator::{
    resolve_versions, AnnotationAggregator, ClassifierBank, DatasetVersion, RoiTable, ScreenDetector,
    TrainingManifest,
};

#[derive(Parser)]
#[command(name = "blm-annotator")]
#[command(about = "Detect launch-monitor screens and annotate their fields")]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Detect the screen in a photo and save it rectified to 900x450
    Rectify {
        /// Path to input image file
        #[arg(value_name = "IMAGE")]
        image_path: PathBuf,

        /// Where to write the rectified image
        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,

        /// Save intermediate stages to directory (must be empty)
        #[arg(long, value_name = "DIR")]
        debug_out: Option<PathBuf>,
    },

    /// Auto-annotate every image of a dataset version
    Annotate {
        /// Model version to annotate with, e.g. v0
        #[arg(long, value_name = "VERSION")]
        model: DatasetVersion,

        /// Dataset version to annotate, e.g. v1
        #[arg(long, value_name = "VERSION")]
        dataset: DatasetVersion,

        #[arg(long, value_name = "DIR", default_value = "./models")]
        models_dir: PathBuf,

        #[arg(long, value_name = "DIR", default_value = "./dataset")]
        dataset_dir: PathBuf,

        /// Detect and rectify the screen before classifying
        #[arg(long)]
        rectify: bool,
    },

    /// Print the annotation record for one image
    Predict {
        #[arg(value_name = "IMAGE")]
        image_path: PathBuf,

        #[arg(long, value_name = "VERSION")]
        model: DatasetVersion,

        #[arg(long, value_name = "DIR", default_value = "./models")]
        models_dir: PathBuf,

        /// Detect and rectify the screen before classifying
        #[arg(long)]
        rectify: bool,
    },

    /// Print the versions pooled when training the given one
    Versions {
        #[arg(value_name = "VERSION")]
        version: String,
    },

    /// Write the pooled training manifest for a dataset version
    Manifest {
        #[arg(long, value_name = "VERSION")]
        dataset: DatasetVersion,

        #[arg(long, value_name = "DIR", default_value = "./dataset")]
        dataset_dir: PathBuf,

        /// ROI definition files, later ones override earlier ones
        #[arg(long = "rois", value_name = "FILE", required = true, num_args = 1..)]
        roi_files: Vec<PathBuf>,

        /// Classifier input size
        #[arg(long, value_names = ["WIDTH", "HEIGHT"], num_args = 2, default_values_t = vec![64, 32])]
        image_size: Vec<u32>,

        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    let args = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(if args.verbose { Level::DEBUG } else { Level::INFO })
        .with_target(false)
        .init();

    match args.command {
        Command::Rectify {
            image_path,
            output,
            debug_out,
        } => {
            info!("Loading image: {:?}", image_path);
            let img = ImageReader::open(&image_path)?
                .decode()
                .map_err(|e| anyhow::anyhow!("Failed to decode image: {}", e))?;
            info!("Image loaded: {}x{}", img.width(), img.height());

            let mut detector = ScreenDetector::new();
            if let Some(dir) = debug_out {
                detector = detector.with_debug(dir)?;
            }

            let quad = detector
                .detect(&img)
                .ok_or_else(|| anyhow::anyhow!("No screen found in {}", image_path.display()))?;
            println!("Screen corners: {:?}", quad.as_tuples());

            let warped = detector.rectify(&img, &quad)?;
            warped.save(&output)?;
            println!("Rectified screen written to {}", output.display());
        }

        Command::Annotate {
            model,
            dataset,
            models_dir,
            dataset_dir,
            rectify,
        } => {
            let aggregator = build_aggregator(&models_dir, model, rectify)?;
            let report = aggregator.annotate_dir(&dataset_dir.join(dataset.to_string()))?;

            println!("\n=== Annotation Results ===");
            println!("Annotated images: {}", report.records.len());
            println!("Skipped images: {}", report.skipped.len());
            for (filename, reason) in &report.skipped {
                println!("  {}: {}", filename, reason);
            }
            println!("Output: {}", report.output.display());
        }

        Command::Predict {
            image_path,
            model,
            models_dir,
            rectify,
        } => {
            let aggregator = build_aggregator(&models_dir, model, rectify)?;
            let image = aggregator
                .load_canonical(&image_path)
                .map_err(|reason| anyhow::anyhow!("{}: {}", image_path.display(), reason))?;
            let filename = image_path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let record = aggregator.annotate(&filename, &image)?;
            println!("{}", serde_json::to_string_pretty(&record)?);
        }

        Command::Versions { version } => {
            for v in resolve_versions(&version)? {
                println!("{}", v);
            }
        }

        Command::Manifest {
            dataset,
            dataset_dir,
            roi_files,
            image_size,
            output,
        } => {
            let rois = RoiTable::load(&roi_files)?;
            info!("Loaded {} ROI definitions", rois.len());

            let size = (image_size[0], image_size[1]);
            let manifest = TrainingManifest::build(&dataset_dir, dataset, &rois, size)?;
            manifest.save(&output)?;

            println!("\n=== Training Manifest ===");
            println!("Versions: {}", manifest.lineage.join(", "));
            for field in &manifest.fields {
                println!(
                    "  {}: {} samples, labels {:?}",
                    field.key_name,
                    field.pool.samples.len(),
                    field.pool.class_labels
                );
            }
            println!("Output: {}", output.display());
        }
    }

    Ok(())
}

fn build_aggregator(
    models_dir: &std::path::Path,
    model: DatasetVersion,
    rectify: bool,
) -> anyhow::Result<AnnotationAggregator> {
    let model_dir = models_dir.join(model.to_string());
    info!("Loading classifiers from {}", model_dir.display());
    let bank = ClassifierBank::load(&model_dir)?;

    let mut aggregator = AnnotationAggregator::new(bank);
    if rectify {
        aggregator = aggregator.with_detector(ScreenDetector::new());
    }
    Ok(aggregator)
}
