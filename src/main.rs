use clap::{Parser, Subcommand};
use photopro::config::{self, ToolConfig};
use photopro::imaging::{OutputFormat, PRESETS, Quality, find_preset};
use photopro::naming::Flow;
use photopro::pdf::{FitMode, Orientation, PageSize, PdfBuildPlan, PdfSettings};
use photopro::output;
use photopro::session::{ImageProcessingSession, SettingsUpdate};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "photopro")]
#[command(about = "Compress, enhance and convert photos, or bind them into a PDF")]
#[command(long_about = "\
Compress, enhance and convert photos, or bind them into a PDF

Everything runs locally on the bytes you give it. Results are written next to
the input (or into --output-dir) with a prefix naming the flow:

  photopro compress beach.png --quality 60     → compressed_beach.jpg
  photopro enhance beach.png --preset warm-tone → enhanced_beach.jpg
  photopro convert scan.bmp --to webp          → converted_scan.webp
  photopro pdf a.jpg b.png notes.pdf           → photos_2024-03-09.pdf

The extension always matches the format actually written: a WebP request that
fell back to JPEG is saved as .jpg.

Accepted inputs: JPEG, PNG, WebP, GIF, BMP (max 10MB each by default), and
for the pdf command also existing PDFs, whose pages are appended after the
image pages.

Set RUST_LOG=debug for encoder and layout diagnostics.
Run 'photopro gen-config' to generate a documented photopro.toml.")]
#[command(version)]
struct Cli {
    /// Config file (optional; stock defaults apply when absent)
    #[arg(long, default_value = config::CONFIG_FILE_NAME, global = true)]
    config: PathBuf,

    /// Directory for output files (default: next to the first input)
    #[arg(long, global = true)]
    output_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

/// Encode overrides shared by the image commands.
#[derive(clap::Args, Clone)]
struct EncodeArgs {
    /// Output format (default from config)
    #[arg(long, value_enum)]
    format: Option<OutputFormat>,

    /// Quality 1-100; for PNG this controls downscaling
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=100))]
    quality: Option<u32>,
}

impl EncodeArgs {
    fn update(&self) -> SettingsUpdate {
        let mut update = SettingsUpdate::new();
        if let Some(format) = self.format {
            update = update.format(format);
        }
        if let Some(quality) = self.quality {
            update = update.quality(Quality::new(quality));
        }
        update
    }
}

/// Layout overrides for the pdf command.
#[derive(clap::Args, Clone)]
struct PdfArgs {
    #[arg(long, value_enum)]
    page_size: Option<PageSize>,

    #[arg(long, value_enum)]
    orientation: Option<Orientation>,

    /// Margin in millimeters
    #[arg(long)]
    margin: Option<f64>,

    #[arg(long, value_enum)]
    fit_mode: Option<FitMode>,

    /// JPEG quality of embedded images, 1-100
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=100))]
    quality: Option<u32>,

    /// Add a title page
    #[arg(long)]
    cover_page: bool,

    /// Title page text (implies --cover-page)
    #[arg(long)]
    cover_title: Option<String>,

    /// Number image pages "n / total"
    #[arg(long)]
    page_numbers: bool,
}

impl PdfArgs {
    fn apply(&self, mut settings: PdfSettings) -> PdfSettings {
        if let Some(v) = self.page_size {
            settings.page_size = v;
        }
        if let Some(v) = self.orientation {
            settings.orientation = v;
        }
        if let Some(v) = self.margin {
            settings.margin = v;
        }
        if let Some(v) = self.fit_mode {
            settings.fit_mode = v;
        }
        if let Some(v) = self.quality {
            settings.quality = Quality::new(v);
        }
        if let Some(title) = &self.cover_title {
            settings.cover_title = Some(title.clone());
            settings.add_cover_page = true;
        }
        settings.add_cover_page |= self.cover_page;
        settings.add_page_numbers |= self.page_numbers;
        settings
    }
}

#[derive(Subcommand)]
enum Command {
    /// Re-encode an image at a lower quality
    Compress {
        file: PathBuf,
        #[command(flatten)]
        encode: EncodeArgs,
    },
    /// Adjust brightness, contrast and saturation
    Enhance {
        file: PathBuf,
        /// Start from a preset (see 'photopro presets')
        #[arg(long)]
        preset: Option<String>,
        /// -100 to 100
        #[arg(long, allow_negative_numbers = true, value_parser = clap::value_parser!(i32).range(-100..=100))]
        brightness: Option<i32>,
        /// -100 to 100
        #[arg(long, allow_negative_numbers = true, value_parser = clap::value_parser!(i32).range(-100..=100))]
        contrast: Option<i32>,
        /// -100 to 100
        #[arg(long, allow_negative_numbers = true, value_parser = clap::value_parser!(i32).range(-100..=100))]
        saturation: Option<i32>,
        #[command(flatten)]
        encode: EncodeArgs,
    },
    /// Convert an image to another format
    Convert {
        file: PathBuf,
        /// Target format
        #[arg(long, value_enum)]
        to: OutputFormat,
        /// Quality 1-100 (default 95 for JPEG, 100 otherwise)
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..=100))]
        quality: Option<u32>,
    },
    /// Combine images and PDFs into one PDF
    Pdf {
        #[arg(required = true)]
        files: Vec<PathBuf>,
        #[command(flatten)]
        layout: PdfArgs,
        /// Output file (default: {name}_{date}.pdf or photos_{date}.pdf)
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// List the enhancement presets
    Presets,
    /// Print a stock photopro.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    match cli.command {
        Command::Compress { file, encode } => {
            let config = config::load_config(&cli.config)?;
            init_thread_pool(&config.processing);
            run_image_flow(Flow::Compress, &file, encode.update(), &config, cli.output_dir.as_deref())?;
        }
        Command::Enhance {
            file,
            preset,
            brightness,
            contrast,
            saturation,
            encode,
        } => {
            let config = config::load_config(&cli.config)?;
            init_thread_pool(&config.processing);
            let mut update = encode.update();
            if let Some(slug) = preset {
                let preset = find_preset(&slug)
                    .ok_or_else(|| format!("Unknown preset '{slug}'. Run 'photopro presets'."))?;
                update = update.filters(preset.settings);
            }
            if let Some(v) = brightness {
                update = update.brightness(v);
            }
            if let Some(v) = contrast {
                update = update.contrast(v);
            }
            if let Some(v) = saturation {
                update = update.saturation(v);
            }
            run_image_flow(Flow::Enhance, &file, update, &config, cli.output_dir.as_deref())?;
        }
        Command::Convert { file, to, quality } => {
            let config = config::load_config(&cli.config)?;
            init_thread_pool(&config.processing);
            let quality = quality
                .map(Quality::new)
                .unwrap_or_else(|| to.default_conversion_quality());
            let update = SettingsUpdate::new().format(to).quality(quality);
            run_image_flow(Flow::Convert, &file, update, &config, cli.output_dir.as_deref())?;
        }
        Command::Pdf {
            files,
            layout,
            output,
        } => {
            let config = config::load_config(&cli.config)?;
            init_thread_pool(&config.processing);
            run_pdf_flow(&files, &layout, output, &config, cli.output_dir.as_deref())?;
        }
        Command::Presets => {
            output::print_presets(PRESETS);
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Upload with `update` folded into the defaults, so the image is encoded
/// once, and write the result under the flow's name.
fn run_image_flow(
    flow: Flow,
    file: &Path,
    update: SettingsUpdate,
    config: &ToolConfig,
    output_dir: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let bytes = std::fs::read(file)?;
    let mut session = ImageProcessingSession::new()
        .with_defaults(config.session_defaults().apply(&update))
        .with_max_file_size(config.limits.max_file_size);

    session.upload(display_name(file), bytes)?;

    let image = session.current().ok_or("no image loaded")?;
    let encoded = image.encoded().ok_or("no encoded output")?;
    if encoded.bytes.is_empty() {
        return Err("encoder produced no output".into());
    }
    let name = session.download_name(flow).ok_or("no encoded output")?;
    let path = output_location(file, output_dir).join(&name);
    std::fs::write(&path, &encoded.bytes)?;
    output::print_image_result(image, &path.display().to_string());
    Ok(())
}

fn run_pdf_flow(
    files: &[PathBuf],
    layout: &PdfArgs,
    output: Option<PathBuf>,
    config: &ToolConfig,
    output_dir: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let settings = layout.apply(config.pdf.clone());
    settings.validate()?;
    let mut plan = PdfBuildPlan::new(settings)
        .with_max_file_size(config.limits.max_file_size);

    for file in files {
        let bytes = std::fs::read(file)?;
        if let Err(e) = plan.add_file(display_name(file), bytes) {
            log::warn!("{}: {e}", file.display());
        }
    }

    let bytes = plan.build()?;
    let path = match output {
        Some(path) => path,
        None => {
            let first = files.first().map(PathBuf::as_path).unwrap_or(Path::new("."));
            output_location(first, output_dir).join(plan.default_file_name())
        }
    };
    std::fs::write(&path, &bytes)?;
    output::print_pdf_result(&plan, &path.display().to_string(), bytes.len() as u64);
    Ok(())
}

fn display_name(file: &Path) -> String {
    file.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| file.display().to_string())
}

/// `output_dir` if given, else the directory holding `input`.
fn output_location(input: &Path, output_dir: Option<&Path>) -> PathBuf {
    match output_dir {
        Some(dir) => dir.to_path_buf(),
        None => input
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(".")),
    }
}

/// Initialize the rayon thread pool based on processing config.
///
/// Never more workers than cores; `max_processes` can only lower the count.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
