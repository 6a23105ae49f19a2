use std::path::{Path, PathBuf};
use std::process;

use clap::Parser;

use facecontour_core::io::document_writer::{write_document, write_image};
use facecontour_core::io::image_file_reader::{load_image, load_mask};
use facecontour_core::io::landmark_reader::load_landmarks;
use facecontour_core::output::domain::output_generator::OutputFormat;
use facecontour_core::output::domain::style::{StyleConfiguration, StylePreset};
use facecontour_core::output::infrastructure::generator_factory::create_generator;
use facecontour_core::pipeline::pipeline_logger::SummaryPipelineLogger;
use facecontour_core::pipeline::process_face_use_case::ProcessFaceUseCase;
use facecontour_core::shared::config::SegmentationConfig;
use facecontour_core::shared::constants::IMAGE_EXTENSIONS;
use facecontour_core::shared::landmarks::LandmarkLayout;

/// Carve a face into numbered anatomical regions and export their contours.
#[derive(Parser)]
#[command(name = "facecontour")]
struct Cli {
    /// Input photo.
    image: PathBuf,

    /// Segmentation map (color-coded or single-channel labels).
    mask: PathBuf,

    /// Landmarks JSON: [{"x":..,"y":..}, ...] or [[x, y], ...].
    landmarks: PathBuf,

    /// Output document path.
    output: PathBuf,

    /// Output format: svg, png or json.
    #[arg(long, default_value = "svg")]
    format: String,

    /// Style preset: default, colorful or minimal.
    #[arg(long, default_value = "default")]
    style: String,

    /// JSON style file; overrides --style.
    #[arg(long)]
    style_file: Option<PathBuf>,

    /// JSON segmentation config; defaults to the user config file if present.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Do not embed the aligned photo behind the regions.
    #[arg(long)]
    no_background: bool,

    /// Also save the overlay preview raster to this path.
    #[arg(long)]
    overlay: Option<PathBuf>,

    /// Write the base64 transport string instead of the decoded document.
    #[arg(long)]
    base64: bool,

    /// Landmark index layout: dlib68 or mediapipe468. Defaults to the config's layout.
    #[arg(long)]
    landmark_layout: Option<String>,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    validate(&cli)?;

    let format: OutputFormat = cli.format.parse()?;
    let style = match &cli.style_file {
        Some(path) => StyleConfiguration::from_file(path)?,
        None => StyleConfiguration::from_preset(cli.style.parse::<StylePreset>()?),
    };
    let config = resolve_config(&cli)?;

    let image = load_image(&cli.image)?;
    let mask = load_mask(&cli.mask)?;
    let landmarks = load_landmarks(&cli.landmarks)?;
    log::info!(
        "Processing {} ({}x{}) with {} landmarks",
        cli.image.display(),
        image.width(),
        image.height(),
        landmarks.len()
    );

    let mut use_case = ProcessFaceUseCase::new(
        config,
        create_generator(format, style),
        Box::new(SummaryPipelineLogger::new()),
    );
    if cli.no_background {
        use_case = use_case.without_background();
    }
    let result = use_case.execute(&image, &mask, &landmarks)?;

    write_document(&cli.output, &result.document, cli.base64)?;
    if let Some(path) = &cli.overlay {
        write_image(path, &result.overlay)?;
    }
    log::info!(
        "Wrote {} regions to {}",
        result.regions.len(),
        cli.output.display()
    );
    Ok(())
}

fn validate(cli: &Cli) -> Result<(), String> {
    for (label, path) in [
        ("Image", &cli.image),
        ("Mask", &cli.mask),
        ("Landmarks file", &cli.landmarks),
    ] {
        if !path.exists() {
            return Err(format!("{label} not found: {}", path.display()));
        }
    }
    for (label, path) in [("Image", &cli.image), ("Mask", &cli.mask)] {
        if !is_image(path) {
            return Err(format!(
                "{label} must be one of: {}",
                IMAGE_EXTENSIONS.join(", ")
            ));
        }
    }
    if let Some(path) = &cli.style_file {
        if !path.exists() {
            return Err(format!("Style file not found: {}", path.display()));
        }
    }
    if let Some(path) = &cli.config {
        if !path.exists() {
            return Err(format!("Config file not found: {}", path.display()));
        }
    }
    if let Some(path) = &cli.overlay {
        if !is_image(path) {
            return Err("--overlay must name an image file (e.g. overlay.png)".to_string());
        }
    }
    Ok(())
}

fn resolve_config(cli: &Cli) -> Result<SegmentationConfig, Box<dyn std::error::Error>> {
    let mut config = match &cli.config {
        Some(path) => SegmentationConfig::from_file(path)?,
        None => SegmentationConfig::load(),
    };
    if let Some(layout) = &cli.landmark_layout {
        config.landmark_layout = parse_landmark_layout(layout)?;
    }
    Ok(config)
}

fn parse_landmark_layout(s: &str) -> Result<LandmarkLayout, String> {
    match s {
        "dlib68" => Ok(LandmarkLayout::dlib68()),
        "mediapipe468" => Ok(LandmarkLayout::mediapipe468()),
        other => Err(format!(
            "unknown landmark layout '{other}', expected dlib68 or mediapipe468"
        )),
    }
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.contains(&e.to_lowercase().as_str()))
        .unwrap_or(false)
}
