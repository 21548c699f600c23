use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use cutout::output::PngSink;
use cutout::segmentation;
use cutout::source::{FileSource, ImageSource};
use cutout::{Pipeline, PipelineConfig};
use image::imageops::FilterType;
use std::path::PathBuf;
use std::process::ExitCode;

/// Resize policy used when scaling the source to the model resolution
#[derive(Debug, Clone, Copy, ValueEnum)]
enum ResizeFilter {
    Nearest,
    Triangle,
    CatmullRom,
    Gaussian,
    Lanczos3,
}

impl From<ResizeFilter> for FilterType {
    fn from(filter: ResizeFilter) -> Self {
        match filter {
            ResizeFilter::Nearest => FilterType::Nearest,
            ResizeFilter::Triangle => FilterType::Triangle,
            ResizeFilter::CatmullRom => FilterType::CatmullRom,
            ResizeFilter::Gaussian => FilterType::Gaussian,
            ResizeFilter::Lanczos3 => FilterType::Lanczos3,
        }
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Image to remove the background from (jpg, png, ...)
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Path to the U²-Net segmentation model (ONNX file)
    #[arg(short, long, default_value = "assets/u2net.onnx")]
    model: PathBuf,

    /// Directory receiving source.png, o6.png..o1.png and composite.png
    #[arg(short, long, default_value = "out")]
    output_dir: PathBuf,

    /// Mask probability at or below which a pixel becomes transparent (0.0-1.0)
    #[arg(short, long, default_value_t = 0.0)]
    cutoff: f32,

    /// Resize filter applied before encoding
    #[arg(long, value_enum, default_value_t = ResizeFilter::Nearest)]
    filter: ResizeFilter,

    /// ONNX Runtime intra-op threads
    #[arg(long, default_value_t = 4)]
    intra_threads: usize,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .init();

    if let Err(err) = run(&args) {
        tracing::error!("{err:#}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

fn run(args: &Args) -> Result<()> {
    tracing::info!("cutout starting");

    let config = PipelineConfig {
        cutoff: args.cutoff,
        ..PipelineConfig::default()
    };
    let pipeline = Pipeline::new(config).context("Invalid pipeline configuration")?;

    let source = FileSource::with_filter(&args.input, args.filter.into())
        .context("Failed to open input image")?;
    if let Some((width, height)) = source.resolution() {
        tracing::info!("Input: {}x{}", width, height);
    }

    let mut model =
        segmentation::create_default_model(&args.model, args.intra_threads).map_err(|err| {
            let message = failure_context(&err);
            anyhow::Error::new(err).context(message)
        })?;
    let (width, height) = model.input_size();
    tracing::info!("Model resolution: {}x{}", width, height);

    let outputs = pipeline
        .run(&source, model.as_mut())
        .map_err(|err| {
            let message = failure_context(&err);
            anyhow::Error::new(err).context(message)
        })?;

    let mut sink = PngSink::new(&args.output_dir).context("Failed to prepare output directory")?;
    outputs
        .write_to(&mut sink)
        .context("Failed to write output images")?;

    tracing::info!(
        "Wrote {} images to {}",
        sink.written().len(),
        args.output_dir.display()
    );

    Ok(())
}

/// Headline for a library failure: model faults are reported apart from image problems
fn failure_context(err: &cutout::Error) -> &'static str {
    if err.is_inference_unavailable() {
        "Segmentation model unavailable"
    } else {
        "Failed to segment image"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_faults_have_their_own_message() {
        let missing = cutout::Error::MissingOutput {
            name: "o0".to_string(),
        };
        let headline = failure_context(&missing);
        assert_eq!(headline, "Segmentation model unavailable");

        let message = format!("{:#}", anyhow::Error::new(missing).context(headline));
        assert_eq!(message, "Segmentation model unavailable: model output o0 is missing");
    }

    #[test]
    fn test_other_failures_keep_generic_message() {
        let io = cutout::Error::Io(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"));
        assert_eq!(failure_context(&io), "Failed to segment image");
    }
}
