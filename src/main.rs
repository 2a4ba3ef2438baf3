//! # Tilemark CLI
//!
//! Command-line interface for tiled text watermarks.
//!
//! ## Usage
//!
//! ```bash
//! # Start the web server on the default port (5000)
//! tilemark serve
//!
//! # Serve on another address, keeping results elsewhere
//! tilemark serve --listen 127.0.0.1:8080 --results-dir /tmp/results
//!
//! # Watermark a single file
//! tilemark apply photo.jpg marked.png --text "CONFIDENTIAL" --angle 30
//!
//! # Offline, with a local font
//! tilemark apply photo.jpg marked.png --text "DRAFT" --no-font-download --font ./Inter.ttf
//! ```

use clap::{Args, Parser, Subcommand};
use image::{DynamicImage, ImageFormat};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

use tilemark::{
    Compositor, TilemarkError, WatermarkSpec, decode,
    font::{self, DEFAULT_FONT_URL, FontConfig},
    server::{self, ServerConfig},
    watermark::{DEFAULT_FONT_SIZE_PERCENT, parse_hex_color},
};

/// Tilemark - tile a text watermark across images
#[derive(Parser, Debug)]
#[command(name = "tilemark")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the HTTP server with the upload page
    Serve {
        /// Address to listen on
        #[arg(long, default_value = "0.0.0.0:5000")]
        listen: String,

        /// Directory generated images are written to
        #[arg(long, default_value = "static/results")]
        results_dir: PathBuf,

        #[command(flatten)]
        fonts: FontArgs,
    },

    /// Watermark a single image file
    Apply {
        /// Source image
        input: PathBuf,

        /// Destination (format chosen by extension)
        output: PathBuf,

        /// Watermark text
        #[arg(long)]
        text: String,

        /// Opacity in percent (0-100)
        #[arg(long, default_value = "50")]
        opacity: f64,

        /// Text color as #RRGGBB
        #[arg(long, default_value = "#FFFFFF")]
        color: String,

        /// Counter-clockwise rotation in degrees
        #[arg(long, default_value = "30", allow_hyphen_values = true)]
        angle: i32,

        /// Font size in percent of the shorter image side
        #[arg(long, default_value_t = DEFAULT_FONT_SIZE_PERCENT)]
        font_size: f64,

        #[command(flatten)]
        fonts: FontArgs,
    },
}

/// Font resolution flags shared by both subcommands.
#[derive(Args, Debug)]
struct FontArgs {
    /// Directory the downloaded font is cached in
    #[arg(long, default_value = "static/fonts")]
    fonts_dir: PathBuf,

    /// Additional font files to try, in order
    #[arg(long = "font", value_name = "FILE")]
    fonts: Vec<PathBuf>,

    /// URL of the preferred font
    #[arg(long, default_value = DEFAULT_FONT_URL)]
    font_url: String,

    /// Never download the preferred font
    #[arg(long)]
    no_font_download: bool,

    /// Fail instead of falling back to the built-in bitmap font
    #[arg(long)]
    no_builtin_font: bool,
}

impl FontArgs {
    fn into_config(self) -> FontConfig {
        FontConfig {
            cache_dir: self.fonts_dir,
            download_url: self.font_url,
            download: !self.no_font_download,
            extra_paths: self.fonts,
            builtin: !self.no_builtin_font,
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("tilemark=debug,tower_http=info")),
        )
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), TilemarkError> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            listen,
            results_dir,
            fonts,
        } => {
            let config = ServerConfig {
                listen_addr: listen,
                results_dir,
                fonts: fonts.into_config(),
            };
            server::serve(config).await
        }
        Commands::Apply {
            input,
            output,
            text,
            opacity,
            color,
            angle,
            font_size,
            fonts,
        } => {
            if !(0.0..=100.0).contains(&opacity) {
                return Err(TilemarkError::InvalidRequest(format!(
                    "opacity must be between 0 and 100, got {}",
                    opacity
                )));
            }
            let spec = WatermarkSpec::new(text.trim())
                .with_opacity(opacity / 100.0)
                .with_color(parse_hex_color(&color)?)
                .with_angle(angle)
                .with_font_size_percent(font_size);
            spec.validate()?;

            let bytes = std::fs::read(&input)?;
            let source = decode::decode_bytes(&bytes)?;

            let font = font::init(&fonts.into_config()).await?;
            let compositor = Compositor::new(font);
            let result = tokio::task::spawn_blocking(move || compositor.apply(&source, &spec))
                .await
                .map_err(|e| TilemarkError::Server(format!("Task error: {}", e)))??;

            save_image(&output, result.image)?;
            info!(
                output = %output.display(),
                font_size = result.font_size,
                drawn = result.drawn,
                "watermark applied"
            );
            println!("Saved to {}", output.display());
            Ok(())
        }
    }
}

/// Save the result, dropping alpha for formats that cannot store it.
fn save_image(path: &PathBuf, image: image::RgbaImage) -> Result<(), TilemarkError> {
    let image = DynamicImage::ImageRgba8(image);
    let saved = match ImageFormat::from_path(path) {
        Ok(ImageFormat::Jpeg) => image.to_rgb8().save(path),
        _ => image.save(path),
    };
    saved.map_err(|e| TilemarkError::Persist(format!("Failed to save {}: {}", path.display(), e)))
}
