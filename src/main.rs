use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};

use yapgen::rendering::fonts::{FaceKey, FontStore};
use yapgen::snapshot::{CaptureOptions, SnapshotBackend, SoftwareBackend, StagedTree};
use yapgen::{Composition, FontFamily};

#[derive(Parser)]
#[command(name = "yapgen", version, about = "Text-over-color social post image generator")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a composition JSON to a PNG
    Render {
        /// Composition JSON file; omit for the starter document
        #[arg(long)]
        input: Option<PathBuf>,

        /// Output PNG path
        #[arg(long, default_value = "post.png")]
        output: PathBuf,

        /// Register a font face, e.g. --font gt-alpina=fonts/Alpina.ttf
        #[arg(long = "font", value_name = "FAMILY=PATH")]
        fonts: Vec<String>,

        /// Pixel-density multiplier (2 matches the export capture)
        #[arg(long, default_value_t = 1.0)]
        scale: f32,
    },
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Render {
            input,
            output,
            fonts,
            scale,
        } => render(input, output, fonts, scale),
    }
}

fn render(
    input: Option<PathBuf>,
    output: PathBuf,
    fonts: Vec<String>,
    scale: f32,
) -> anyhow::Result<()> {
    let composition: Composition = match input {
        Some(path) => {
            let json = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            serde_json::from_str(&json)
                .with_context(|| format!("failed to parse {}", path.display()))?
        }
        None => Composition::starter(),
    };

    let store = FontStore::new();
    for entry in &fonts {
        let (family, path) = entry
            .split_once('=')
            .context("--font expects FAMILY=PATH")?;
        let family: FontFamily = family.parse()?;
        store.load_face_file(FaceKey::regular(family), std::path::Path::new(path))?;
    }

    let backend = SoftwareBackend::new(Arc::new(store));
    let tree = StagedTree::from_composition(&composition);
    let options = CaptureOptions {
        canvas: composition.canvas,
        scale,
    };
    let bitmap = backend.capture(&tree, &options)?;

    std::fs::write(&output, &bitmap.png_data)
        .with_context(|| format!("failed to write {}", output.display()))?;
    println!(
        "wrote {}x{} PNG ({} bytes) to {}",
        bitmap.width,
        bitmap.height,
        bitmap.png_data.len(),
        output.display()
    );
    Ok(())
}
