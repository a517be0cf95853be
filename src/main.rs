use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use clap::{Args as ClapArgs, Parser, Subcommand};
use rootcause::prelude::*;
use serde::Serialize;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use meshswatch::catalog::{CatalogSelection, ModelKind};
use meshswatch::config::ViewerConfig;
use meshswatch::export::glb::export_glb;
use meshswatch::materials::Selections;
use meshswatch::viewer::appearance::load_texture_file;
use meshswatch::viewer::{Gesture, GestureAnimator, ModelSession, ModelStatistics};

/// Discover material groups in GLB/OBJ models and swap their materials
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Log at debug level regardless of RUST_LOG
    #[clap(short, long, global = true)]
    verbose: bool,

    /// Viewer config file (JSON). Defaults to the built-in catalog.
    #[clap(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

/// A model file, or a catalog entry resolved against the asset root
#[derive(ClapArgs, Debug)]
struct ModelSource {
    #[clap(required_unless_present = "model")]
    file: Option<PathBuf>,
    /// Catalog id, e.g. `chair`
    #[clap(short, long, conflicts_with = "file")]
    model: Option<String>,
}

impl ModelSource {
    fn open(&self, config: &ViewerConfig) -> Result<ModelSession, Report> {
        let session = match (&self.file, &self.model) {
            (_, Some(id)) => {
                let mut selection = CatalogSelection::default();
                let info = selection
                    .select(&config.models, id)
                    .context("Failed to select catalog model")?;
                ModelSession::open_model(info, &config.asset_root)
                    .context_with(|| format!("Failed to load catalog model {id}"))?
            }
            (Some(file), None) => ModelSession::open(file)
                .context_with(|| format!("Failed to load {}", file.display()))?,
            (None, None) => bail!("No model file or catalog id given"),
        };
        Ok(session.with_max_group_pickers(config.max_group_pickers))
    }

    fn label(&self) -> String {
        match (&self.file, &self.model) {
            (_, Some(id)) => id.clone(),
            (Some(file), None) => file.display().to_string(),
            (None, None) => String::new(),
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the models in the catalog
    Catalog,
    /// Print statistics, pickable materials, material groups and animation clips
    Inspect {
        #[clap(flatten)]
        source: ModelSource,
        /// Print as JSON
        #[clap(long)]
        json: bool,
    },
    /// Apply material selections and write the result as GLB
    Apply {
        #[clap(flatten)]
        source: ModelSource,
        /// `GROUP=MATERIAL`, e.g. `group_1=Leather`. May be repeated.
        #[clap(short, long = "select", value_parser = parse_selection)]
        selections: Vec<(String, String)>,
        /// Draw every mesh in this color (`#RGB` or `#RRGGBB`)
        #[clap(long, conflicts_with = "texture")]
        color: Option<String>,
        /// Draw every mesh with this image
        #[clap(long)]
        texture: Option<PathBuf>,
        #[clap(short, long)]
        output: PathBuf,
    },
    /// Print the per-frame rotation of a head gesture until it finishes
    Gesture {
        #[clap(value_enum)]
        gesture: Gesture,
        /// Pointer height in [-1, 1], used for the resting pose
        #[clap(long, default_value_t = 0.0, allow_hyphen_values = true)]
        pointer_y: f32,
        #[clap(long, default_value_t = 1000)]
        max_frames: usize,
    },
}

fn parse_selection(value: &str) -> Result<(String, String), String> {
    let (group, material) = value
        .split_once('=')
        .ok_or_else(|| format!("expected GROUP=MATERIAL, got {value:?}"))?;
    if group.is_empty() || material.is_empty() {
        return Err(format!("expected GROUP=MATERIAL, got {value:?}"));
    }
    Ok((group.to_string(), material.to_string()))
}

#[derive(Serialize)]
struct GroupSummary<'a> {
    id: &'a str,
    materials: &'a [String],
    nodes: Vec<&'a str>,
    picker: bool,
}

#[derive(Serialize)]
struct Inspection<'a> {
    statistics: ModelStatistics,
    materials: &'a [String],
    groups: Vec<GroupSummary<'a>>,
    animations: Vec<&'a str>,
}

fn main() -> Result<(), Report> {
    let args = Args::parse();

    let filter = if args.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = match &args.config {
        Some(path) => ViewerConfig::load(path)
            .context_with(|| format!("Failed to load config {}", path.display()))?,
        None => ViewerConfig::default(),
    };

    match args.command {
        Command::Catalog => {
            for model in config.models.iter() {
                let kind = match model.kind {
                    ModelKind::Glb => "glb",
                    ModelKind::Obj => "obj",
                };
                println!(
                    "{:<16} {:<4} {:<20} {}",
                    model.id,
                    kind,
                    model.name,
                    model.resolve(&config.asset_root).display()
                );
            }
        }
        Command::Inspect { source, json } => {
            let session = source.open(&config)?;
            let scene = session.scene();
            let pickers = session.display_groups().len();

            let inspection = Inspection {
                statistics: session.statistics(),
                materials: session.material_names(),
                groups: session
                    .groups()
                    .iter()
                    .enumerate()
                    .map(|(i, group)| GroupSummary {
                        id: &group.id,
                        materials: &group.material_set,
                        nodes: group.nodes.iter().map(|n| scene.node(*n).name()).collect(),
                        picker: i < pickers,
                    })
                    .collect(),
                animations: session.animation().names().collect(),
            };

            if json {
                let out = serde_json::to_string_pretty(&inspection)
                    .context("Failed to serialize inspection")?;
                println!("{out}");
            } else {
                print_inspection(&inspection);
            }
        }
        Command::Apply {
            source,
            selections,
            color,
            texture,
            output,
        } => {
            let mut session = source.open(&config)?;
            let label = source.label();

            if !selections.is_empty() {
                for (group, _) in &selections {
                    if !session.groups().iter().any(|g| &g.id == group) {
                        warn!("{label} has no material group {group:?}");
                    }
                }
                let selections: Selections = selections.into_iter().collect();
                let invalidation = session.select_all(selections);
                info!("updated {} mesh(es)", invalidation.meshes_updated);
            }

            if (color.is_some() || texture.is_some()) && session.kind() == ModelKind::Glb {
                warn!("appearance override replaces every material of {label}");
            }
            if let Some(color) = color {
                session.set_color(&color).context("Failed to apply color")?;
            }
            if let Some(texture) = texture {
                let source = load_texture_file(&texture)
                    .context_with(|| format!("Failed to read texture {}", texture.display()))?;
                session.set_texture(source).context("Failed to apply texture")?;
            }

            let scene = session.into_scene();
            let out = File::create(&output)
                .context_with(|| format!("Failed to create {}", output.display()))?;
            let mut writer = BufWriter::new(out);
            export_glb(&scene, &mut writer).context("Failed to export GLB")?;
            writer.flush().context("Failed to flush GLB output")?;
            info!("wrote {}", output.display());
        }
        Command::Gesture {
            gesture,
            pointer_y,
            max_frames,
        } => {
            let mut animator = GestureAnimator::new();
            animator.set_pointer(0.0, pointer_y);
            for (frame, rotation) in animator.run(gesture, max_frames).iter().enumerate() {
                println!("{frame:>4} x={:+.4} y={:+.4}", rotation.x, rotation.y);
            }
        }
    }

    Ok(())
}

fn print_inspection(inspection: &Inspection<'_>) {
    let s = &inspection.statistics;
    println!("meshes:     {}", s.meshes);
    println!("vertices:   {}", s.vertices);
    println!("faces:      {}", s.faces);
    println!("materials:  {}", s.materials);
    println!("textures:   {}", s.textures);
    println!("bones:      {}", s.bones);
    println!("animations: {}", s.animations);

    println!();
    println!("pickable materials: {}", inspection.materials.join(", "));

    println!();
    for group in &inspection.groups {
        let marker = if group.picker { "*" } else { " " };
        println!(
            "{marker} {}: [{}] on {}",
            group.id,
            group.materials.join(", "),
            group.nodes.join(", ")
        );
    }

    if !inspection.animations.is_empty() {
        println!();
        println!("animation clips: {}", inspection.animations.join(", "));
    }
}
