use clap::{Args, Parser, Subcommand};
use image_toolbox::batch::{BatchOutcome, BatchRequest, spawn_batch};
use image_toolbox::cache::PreviewCache;
use image_toolbox::config::{self, ToolboxConfig};
use image_toolbox::file::{CacheFileController, FileController, FsFileController};
use image_toolbox::filters::parse::parse_filter;
use image_toolbox::imaging::{
    ImageBackend, ImageFormat, Quality, ResizeType, RustBackend, supported_input_extensions,
};
use image_toolbox::output;
use image_toolbox::palette::extract_palette;
use image_toolbox::presets::Preset;
use image_toolbox::screen::{ordered_tools, shared_targets};
use image_toolbox::session::{FilterSession, ResizeSession};
use image_toolbox::settings::{SettingsRepository, SettingsState};
use image_toolbox::settings::store::TomlFileStore;
use image_toolbox::types::Uri;
use std::error::Error;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::mpsc;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

#[derive(Parser)]
#[command(name = "image-toolbox")]
#[command(about = "Resize, convert and filter images in batches")]
#[command(long_about = "\
Resize, convert and filter images in batches

Inputs are image files or directories. Directories are walked recursively
and every decodable image (jpg, png, tif, webp, bmp) is picked up.

Where results go and how they are named comes from the user preferences
(see 'image-toolbox settings list'): save_folder, filename_prefix,
add_sequence_number, add_original_filename, add_size_in_filename,
randomize_filename and overwrite_files.

Filters use the syntax name[:v1[:v2]], for example:

  grayscale
  brightness:0.2
  vignette:0.3:0.75
  monochrome:0.8:#996633
  palette_transfer:1:reference.jpg

Run 'image-toolbox gen-config' to generate a documented config.toml.")]
#[command(version)]
struct Cli {
    /// Directory holding config.toml, preferences and the cache
    #[arg(long, default_value = ".", global = true)]
    root: PathBuf,

    /// More log output (-v info, -vv debug). RUST_LOG overrides
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

/// Flags shared by commands that write images.
#[derive(Args, Clone)]
struct OutputArgs {
    /// Output directory (default: save_folder preference, then [output] directory)
    #[arg(long, short)]
    output: Option<PathBuf>,

    /// Output format: jpeg, png, webp, avif, bmp
    #[arg(long)]
    format: Option<ImageFormat>,

    /// Encoder quality 1-100 for jpeg and avif
    #[arg(long)]
    quality: Option<u32>,

    /// Copy EXIF from JPEG sources into JPEG outputs
    #[arg(long, overrides_with = "strip_metadata")]
    keep_metadata: bool,

    /// Never copy EXIF
    #[arg(long)]
    strip_metadata: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Resize and convert images
    Resize {
        /// Image files or directories
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        #[arg(long)]
        width: Option<u32>,

        #[arg(long)]
        height: Option<u32>,

        /// explicit, fit, fill, crop, limits[:skip|recode|zoom]
        #[arg(long, default_value = "explicit")]
        resize_type: ResizeType,

        /// Percentage of the first image's size (also sets quality), or telegram
        #[arg(long)]
        preset: Option<Preset>,

        /// Clockwise rotation in degrees, a multiple of 90
        #[arg(long, default_value_t = 0)]
        rotate: u32,

        /// Mirror horizontally
        #[arg(long)]
        flip: bool,

        /// Write share copies into the cache instead of saving
        #[arg(long)]
        share: bool,

        #[command(flatten)]
        out: OutputArgs,
    },
    /// Apply a filter chain to images, keeping their size
    Filter {
        /// Image files or directories
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Filter spec, repeat to chain
        #[arg(long = "filter", short = 'f', required = true)]
        filters: Vec<String>,

        /// Also write a preview of the first image here (PNG)
        #[arg(long)]
        preview: Option<PathBuf>,

        #[command(flatten)]
        out: OutputArgs,
    },
    /// Print the dominant colors of an image
    Palette {
        image: PathBuf,

        /// Number of colors (2-256)
        #[arg(long, short, default_value_t = 8)]
        count: usize,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Show or change user preferences
    Settings {
        #[command(subcommand)]
        command: SettingsCommand,
    },
    /// List tools in the user's order, or where shared images can go
    Screens {
        /// Images being shared
        #[arg(long, num_args = 1..)]
        share: Vec<String>,
    },
    /// Print a stock config.toml with all options documented
    GenConfig,
}

#[derive(Subcommand)]
enum SettingsCommand {
    /// Print every preference
    List,
    /// Print one preference
    Get { key: String },
    /// Change one preference ("none" clears optional values)
    Set { key: String, value: String },
    /// Restore every preference to its default
    Reset,
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Command::GenConfig = cli.command {
        print!("{}", config::stock_config_toml());
        return Ok(());
    }

    let config = config::load_config(&cli.root)?;
    init_thread_pool(&config.processing);

    let store = TomlFileStore::open(config.resolve(&cli.root, &config.storage.preferences))?;
    let mut settings = SettingsRepository::open(store)?;
    let state = settings.increment_open_count()?;
    let cache_dir = config.resolve(&cli.root, &config.storage.cache_dir);
    let share_cache = CacheFileController::new(cache_dir.join("share"));
    if state.clear_cache_on_launch {
        match share_cache.clear() {
            Ok(removed) => info!(removed, "cleared share cache"),
            Err(e) => warn!(error = %e, "could not clear share cache"),
        }
        match PreviewCache::open(cache_dir.join("previews")).and_then(|mut cache| cache.clear()) {
            Ok(removed) => info!(removed, "cleared preview cache"),
            Err(e) => warn!(error = %e, "could not clear preview cache"),
        }
    }

    match cli.command {
        Command::Resize {
            inputs,
            width,
            height,
            resize_type,
            preset,
            rotate,
            flip,
            share,
            out,
        } => {
            let uris = collect_inputs(&inputs)?;
            let backend = Arc::new(RustBackend::new());
            let controller = Arc::new(file_controller(&cli.root, &config, &out, &state));
            let keep_metadata = keep_metadata(&out, state.keep_metadata);

            let mut session = ResizeSession::new(backend.clone(), controller.clone(), keep_metadata);
            if let Err(e) = session.update_uris(uris) {
                warn!(error = %e, "no source could be previewed");
            }
            session.set_resize_type(resize_type);
            session.set_format(out.format.unwrap_or(config.output.format));
            session.set_quality(Quality::new(out.quality.unwrap_or(config.output.quality)));
            if let Some(width) = width {
                session.set_width(width);
            }
            if let Some(height) = height {
                session.set_height(height);
            }
            if let Some(preset) = preset {
                session.set_preset(preset);
            }
            for _ in 0..(rotate / 90) % 4 {
                session.rotate_right();
            }
            if flip {
                session.flip();
            }
            debug!(info = ?session.state().info, "resize target");

            if share {
                let paths = session.share(&share_cache);
                for path in &paths {
                    println!("{}", path.display());
                }
                println!("Shared {} images → {}", paths.len(), share_cache.saving_path());
                return Ok(());
            }
            finish(run_streaming(backend, controller, session.request())?)?;
        }
        Command::Filter {
            inputs,
            filters,
            preview,
            out,
        } => {
            let uris = collect_inputs(&inputs)?;
            let backend = Arc::new(RustBackend::new());
            let controller = Arc::new(file_controller(&cli.root, &config, &out, &state));
            let cache = PreviewCache::open(cache_dir.join("previews"))?;

            let mut session = FilterSession::new(backend.clone(), controller.clone(), config.preview_size())
                .with_cache(cache);
            if let Err(e) = session.update_uris(uris) {
                warn!(error = %e, "no source could be previewed");
            }
            for spec in &filters {
                session.add_filter(parse_filter(spec, load_reference)?)?;
            }
            session.set_format(out.format.unwrap_or(config.output.format));
            session.set_quality(Quality::new(out.quality.unwrap_or(config.output.quality)));
            session.set_keep_metadata(keep_metadata(&out, state.keep_metadata));

            if let Some(path) = preview {
                if let Some(rendered) = &session.state().preview {
                    rendered.save_with_format(&path, image::ImageFormat::Png)?;
                    println!("Preview → {}", path.display());
                }
                if let Some(cache) = session.cache() {
                    println!("Cache: {}", cache.stats());
                }
            }
            finish(run_streaming(backend, controller, session.request())?)?;
        }
        Command::Palette { image, count, json } => {
            let backend = RustBackend::new();
            let data = backend.get_image(&Uri::from_path(&image))?;
            let swatches = extract_palette(&data.image, count);
            if json {
                println!("{}", serde_json::to_string_pretty(&swatches)?);
            } else {
                output::print_palette(&swatches);
            }
        }
        Command::Settings { command } => match command {
            SettingsCommand::List => output::print_settings(&settings.state().entries()),
            SettingsCommand::Get { key } => match settings.state().get(&key) {
                Some(value) => println!("{}", value),
                None => return Err(format!("unknown setting {key:?}").into()),
            },
            SettingsCommand::Set { key, value } => {
                let state = settings.set_by_name(&key, &value)?;
                println!("{} = {}", key, state.get(&key).unwrap_or_default());
            }
            SettingsCommand::Reset => {
                settings.reset()?;
                println!("Preferences reset");
            }
        },
        Command::Screens { share } => {
            if share.is_empty() {
                output::print_screens(&ordered_tools(&state.screen_list));
            } else {
                let uris: Vec<Uri> = share.into_iter().map(Uri::new).collect();
                output::print_screens(&shared_targets(&uris));
            }
        }
        Command::GenConfig => {}
    }

    Ok(())
}

/// Install the log subscriber. Logs go to stderr so stdout stays clean.
fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Initialize the rayon thread pool based on processing config.
///
/// Caps at the number of available CPU cores; user can constrain down, not up.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}

fn keep_metadata(out: &OutputArgs, preference: bool) -> bool {
    if out.strip_metadata {
        false
    } else {
        out.keep_metadata || preference
    }
}

fn file_controller(
    root: &Path,
    config: &ToolboxConfig,
    out: &OutputArgs,
    state: &SettingsState,
) -> FsFileController {
    match &out.output {
        Some(dir) => FsFileController::new(dir, state.filename_policy()),
        None => FsFileController::from_settings(state, &config.resolve(root, &config.output.directory)),
    }
}

fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| supported_input_extensions().contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Expand directories into the images they contain, sorted by path.
fn collect_inputs(inputs: &[PathBuf]) -> Result<Vec<Uri>, Box<dyn Error>> {
    let mut uris = Vec::new();
    for input in inputs {
        if !input.is_dir() {
            uris.push(Uri::from_path(input));
            continue;
        }
        for entry in WalkDir::new(input).sort_by_file_name() {
            match entry {
                Ok(entry) if entry.file_type().is_file() && is_supported(entry.path()) => {
                    uris.push(Uri::from_path(entry.path()));
                }
                Ok(_) => {}
                Err(e) => warn!(error = %e, "skipping unreadable entry"),
            }
        }
    }
    if uris.is_empty() {
        return Err("no images found in the given inputs".into());
    }
    Ok(uris)
}

fn load_reference(path: &Path) -> Result<image::RgbaImage, String> {
    image::open(path)
        .map(|image| image.to_rgba8())
        .map_err(|e| e.to_string())
}

/// Run `request` on the batch thread, printing events as they arrive.
fn run_streaming<B, F>(
    backend: Arc<B>,
    controller: Arc<F>,
    request: BatchRequest,
) -> Result<BatchOutcome, Box<dyn Error>>
where
    B: ImageBackend + Send + 'static,
    F: FileController + 'static,
{
    let (tx, rx) = mpsc::channel();
    let handle = spawn_batch(backend, controller, request, tx)?;
    for event in rx {
        output::print_batch_event(&event);
    }
    handle.join().map_err(|_| "batch thread panicked".into())
}

fn finish(outcome: BatchOutcome) -> Result<(), Box<dyn Error>> {
    match outcome {
        BatchOutcome::MissingPermissions => Err("missing permission to write output".into()),
        BatchOutcome::Rejected => Err("nothing to save".into()),
        _ => Ok(()),
    }
}
