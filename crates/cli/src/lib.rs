use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use stampdesk_core::{
    config, AnnotationBody, Color, ConfigStore, Document, Editor, EditorConfig, EventDisposition,
    FontSpec, Point, TextSpec,
};
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "stampdesk-cli")]
#[command(about = "Stampdesk CLI")]
pub struct Cli {
    /// Editor settings file; defaults to the per-user config.
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,
    /// Log debug output to stderr.
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print machine-readable pages and annotations.
    Info {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// Place a free-text annotation centered on a page point.
    AddText {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        #[command(flatten)]
        target: PlacementTarget,
        #[arg(long)]
        text: String,
        #[arg(long)]
        font_size: Option<f32>,
        #[arg(long)]
        font: Option<String>,
        #[arg(long)]
        color: Option<Color>,
        #[arg(long)]
        background: Option<Color>,
    },
    /// Place an image stamp centered on a page point.
    AddImage {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        #[arg(long, value_name = "IMAGE")]
        image: PathBuf,
        #[command(flatten)]
        target: PlacementTarget,
    },
    /// Render a page with its annotations to PNG.
    Render {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long)]
        zoom: Option<f32>,
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Print CLI version.
    Version,
}

#[derive(Debug, Args)]
struct PlacementTarget {
    /// 1-based page number.
    #[arg(long, default_value_t = 1)]
    page: u32,
    /// Horizontal position in PDF points from the left page edge.
    #[arg(long)]
    x: f32,
    /// Vertical position in PDF points from the bottom page edge.
    #[arg(long)]
    y: f32,
    /// Where to write the annotated PDF; defaults to overwriting FILE.
    #[arg(long)]
    output: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
struct InfoOutput {
    path: String,
    page_count: usize,
    pages: Vec<PageOutput>,
}

#[derive(Debug, Serialize)]
struct PageOutput {
    index: usize,
    width: f32,
    height: f32,
    annotations: Vec<AnnotationOutput>,
}

#[derive(Debug, Serialize)]
struct AnnotationOutput {
    kind: &'static str,
    x: f32,
    y: f32,
    width: f32,
    height: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    contents: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    font_size: Option<f32>,
}

pub fn run<I, T>(args: I) -> Result<()>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = Cli::parse_from(args);
    init_logging(cli.verbose);

    match cli.command {
        Commands::Info { file } => run_info(&file, load_config(cli.config.as_deref())?),
        Commands::AddText { file, target, text, font_size, font, color, background } => {
            let config = load_config(cli.config.as_deref())?;
            let defaults = config.default_text.clone();
            let spec = TextSpec {
                content: text,
                font: FontSpec {
                    family: font.unwrap_or(defaults.font.family),
                    size: config.clamp_font_size(font_size.unwrap_or(defaults.font.size)),
                },
                text_color: color.unwrap_or(defaults.text_color),
                background: background.or(defaults.background),
            };
            run_add(&file, &target, config, |editor| editor.arm_text_placement(spec))
        }
        Commands::AddImage { file, image, target } => {
            let config = load_config(cli.config.as_deref())?;
            run_add(&file, &target, config, |editor| editor.arm_image_placement_from_path(&image))
        }
        Commands::Render { file, page, zoom, output } => {
            run_render(&file, page, zoom, output.as_deref(), load_config(cli.config.as_deref())?)
        }
        Commands::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let fmt_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr).with_target(false);

    // A second `run` in the same process keeps the first subscriber.
    let _ = tracing_subscriber::registry().with(filter).with(fmt_layer).try_init();
}

fn load_config(path: Option<&Path>) -> Result<EditorConfig> {
    if let Some(path) = path {
        return config::load_file(path)
            .with_context(|| format!("failed to load config from {}", path.display()));
    }

    match ConfigStore::from_default_project().and_then(|store| store.load()) {
        Ok(config) => Ok(config),
        Err(error) => {
            tracing::warn!(%error, "falling back to default editor settings");
            Ok(EditorConfig::default())
        }
    }
}

fn open_editor(file: &Path, config: EditorConfig) -> Result<Editor> {
    ensure_pdf_exists(file)?;

    let mut editor = Editor::with_default_engine(config);
    editor.open_document(file).context("failed to open PDF")?;
    Ok(editor)
}

fn run_info(file: &Path, config: EditorConfig) -> Result<()> {
    let editor = open_editor(file, config)?;
    let document = editor.document().context("document closed unexpectedly")?;

    let payload = InfoOutput {
        path: file.display().to_string(),
        page_count: document.page_count(),
        pages: page_outputs(document),
    };

    let json = serde_json::to_string_pretty(&payload)?;
    println!("{json}");

    Ok(())
}

fn page_outputs(document: &Document) -> Vec<PageOutput> {
    document
        .pages()
        .iter()
        .map(|page| PageOutput {
            index: page.index(),
            width: page.visible_box().width,
            height: page.visible_box().height,
            annotations: page
                .annotations()
                .iter()
                .map(|annotation| {
                    let bounds = annotation.bounds();
                    let (kind, contents, font_size) = match annotation.body() {
                        AnnotationBody::Text(body) => {
                            ("text", Some(body.contents.clone()), Some(body.style.font.size))
                        }
                        AnnotationBody::Stamp(_) => ("stamp", None, None),
                    };
                    AnnotationOutput {
                        kind,
                        x: bounds.x,
                        y: bounds.y,
                        width: bounds.width,
                        height: bounds.height,
                        contents,
                        font_size,
                    }
                })
                .collect(),
        })
        .collect()
}

fn run_add<F>(file: &Path, target: &PlacementTarget, config: EditorConfig, arm: F) -> Result<()>
where
    F: FnOnce(&mut Editor) -> Result<(), stampdesk_core::EditorError>,
{
    let page_index = page_index(target.page)?;
    let mut editor = open_editor(file, config)?;
    arm(&mut editor).context("failed to prepare placement")?;

    let surface = editor.surface_mut();
    let point = surface
        .view_point(page_index, Point::new(target.x, target.y))
        .with_context(|| format!("page {} does not exist", target.page))?;

    if surface.pointer_down(point, 1) != EventDisposition::Consumed {
        anyhow::bail!("point ({}, {}) is outside page {}", target.x, target.y, target.page);
    }
    surface.pointer_up(point);

    let output = target.output.clone().unwrap_or_else(|| file.to_path_buf());
    if let Some(parent) = output.parent() {
        fs::create_dir_all(parent)?;
    }
    editor.save_document(&output).context("failed to save PDF")?;

    println!("{}", output.display());

    Ok(())
}

fn run_render(
    file: &Path,
    page: u32,
    zoom: Option<f32>,
    output: Option<&Path>,
    config: EditorConfig,
) -> Result<()> {
    let page_index = page_index(page)?;
    let mut editor = open_editor(file, config)?;
    if let Some(zoom) = zoom {
        editor.surface_mut().set_zoom(zoom);
    }

    let image = editor.render_page(page_index).context("failed to render page")?;

    let output = output.map(ToOwned::to_owned).unwrap_or_else(|| default_render_output(file, page));

    if let Some(parent) = output.parent() {
        fs::create_dir_all(parent)?;
    }

    image
        .save(&output)
        .with_context(|| format!("failed to write image to {}", output.display()))?;

    println!("{}", output.display());

    Ok(())
}

fn page_index(page: u32) -> Result<usize> {
    if page == 0 {
        anyhow::bail!("--page is 1-based and must be >= 1");
    }
    Ok(page as usize - 1)
}

fn ensure_pdf_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        anyhow::bail!("file does not exist: {}", path.display());
    }

    if !path.is_file() {
        anyhow::bail!("path is not a file: {}", path.display());
    }

    Ok(())
}

fn default_render_output(file: &Path, page: u32) -> PathBuf {
    let stem = file.file_stem().and_then(|name| name.to_str()).unwrap_or("page");

    file.with_file_name(format!("{stem}-page-{page}.png"))
}
