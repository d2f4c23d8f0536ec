//! Command-line driver for the furnigen floor-plan layout engine.
//!
//! Loads a colored floor-plan image plus JSON furniture/constraint/catalog
//! files, runs the full pipeline (segment → compile → optimize → convert →
//! assemble), and writes the grid dump and placement payload as JSON to
//! stdout or `--out`: a terminal-driven equivalent of curling the FastAPI
//! endpoint the Python service this replaces exposed.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use image::RgbImage;

use furnigen::config::OptimizerParams;
use furnigen::coords;
use furnigen::error::FurnigenError;
use furnigen::furniture::{compile_room, ConstraintsByRoom, SpecsByRoom};
use furnigen::grid::{Grid, GridBuilder, GridDump};
use furnigen::optimizer::{self, RoomProblem};
use furnigen::scene::{self, AssembledItem, CatalogEntry};
use furnigen::segmenter;
use furnigen::validate;

#[derive(Parser, Debug)]
#[command(name = "furnigen", about = "Floor-plan segmentation and furniture-layout optimizer")]
struct Cli {
    /// Path to the colored floor-plan image (PNG or JPEG).
    #[arg(long)]
    image: PathBuf,

    /// Physical width of the floor plan's envelope, in metres.
    #[arg(long)]
    envelope_width_m: f64,

    /// Path to the per-room furniture spec JSON (`{room: [FurnitureSpec]}`).
    #[arg(long)]
    furniture: PathBuf,

    /// Path to the per-room constraint-set JSON (`{room: RoomConstraints}`).
    #[arg(long)]
    constraints: PathBuf,

    /// Optional path to a flat catalog-metadata JSON array.
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Optional TOML file overriding optimizer parameters.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Room names to pair with detected regions, by priority, largest region first.
    #[arg(long, value_delimiter = ',')]
    required_rooms: Vec<String>,

    /// Where to write the JSON result; defaults to stdout.
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(serde::Serialize)]
struct Output {
    grid: GridDump,
    placements: Vec<AssembledItem>,
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    run(cli).await
}

async fn run(cli: Cli) -> Result<()> {
    let params = load_params(cli.config.as_deref())?;

    let image = read_image(&cli.image).await?;
    let grid = match segmenter::segment_floorplan(
        &image,
        cli.envelope_width_m,
        params.cell_size_m,
        &cli.required_rooms,
    ) {
        Ok(grid) => grid,
        Err(FurnigenError::NoRoomsDetected) => {
            log::warn!("segmenter: no rooms detected, falling back to a single full-envelope room");
            fallback_full_envelope_grid(cli.envelope_width_m, image.height(), image.width(), params.cell_size_m)
        }
        Err(e) => return Err(anyhow::anyhow!("segmenter: {e}")),
    };

    let specs: SpecsByRoom = read_json(&cli.furniture)?;
    let constraints: ConstraintsByRoom = read_json(&cli.constraints)?;

    let mut rooms = Vec::new();
    for room_name in grid.room_names() {
        let room_specs = specs.get(room_name).cloned().unwrap_or_default();
        let room_constraints = constraints.get(room_name).cloned().unwrap_or_default();
        let (items, compiled) = compile_room(room_name, &room_specs, &room_constraints, &params);
        rooms.push(RoomProblem { room: room_name.to_string(), items, constraints: compiled });
    }

    let abort = Arc::new(AtomicBool::new(false));
    let placements = solve(grid.clone(), rooms.clone(), params.clone(), abort).await?;

    for failure in validate::validate_placement(&grid, &placements, &rooms, params.door_clearance_cells) {
        log::warn!("validation: {failure}");
    }

    let placements_3d = coords::convert_all(&placements, &grid, &params);
    for failure in validate::validate_scene(&grid, &placements_3d, params.wall_margin_m) {
        log::warn!("validation: {failure}");
    }

    let catalog = match &cli.catalog {
        Some(path) => scene::index_catalog(read_json::<Vec<CatalogEntry>>(path)?),
        None => HashMap::new(),
    };
    let assembled = scene::assemble(placements_3d, &catalog);

    let output = Output { grid: grid.to_dump(), placements: assembled };
    let json = serde_json::to_string_pretty(&output).context("serializing output")?;

    match &cli.out {
        Some(path) => fs::write(path, json).with_context(|| format!("writing {}", path.display()))?,
        None => println!("{json}"),
    }

    Ok(())
}

/// Image reading is one of `furnigen`'s two I/O boundaries (`spec.md` §5);
/// offloaded to the blocking-task pool so the async host never stalls its
/// executor on file I/O or image decoding.
async fn read_image(path: &Path) -> Result<RgbImage> {
    let path = path.to_path_buf();
    tokio::task::spawn_blocking(move || -> Result<RgbImage> {
        let image = image::open(&path).with_context(|| format!("reading floor-plan image {}", path.display()))?;
        Ok(image.into_rgb8())
    })
    .await
    .context("image-read task panicked")?
}

/// `optimize_layout` is a blocking, potentially multi-second call (`spec.md`
/// §5); offloaded the same way the image read is.
async fn solve(
    grid: furnigen::grid::Grid,
    rooms: Vec<RoomProblem>,
    params: OptimizerParams,
    abort: Arc<AtomicBool>,
) -> Result<Vec<furnigen::placement::PlacedItem>> {
    tokio::task::spawn_blocking(move || optimizer::optimize_layout(&grid, &rooms, &params, &abort))
        .await
        .context("optimizer task panicked")?
        .map_err(|e| anyhow::anyhow!("optimizer: {e}"))
}

/// `spec.md` §4.B/§7: when the segmenter finds no room pixels, the caller may
/// substitute a default full-envelope room rather than failing outright. A
/// single room named "room" spans every cell, using the same `W = round(W_m /
/// s)` / `H = round(image_h * W / image_w)` sizing the segmenter itself uses
/// so the fallback grid has the dimensions the original image implied.
fn fallback_full_envelope_grid(envelope_width_m: f64, image_height: u32, image_width: u32, cell_size_m: f64) -> Grid {
    let width = (envelope_width_m / cell_size_m).round().max(1.0) as u32;
    let height = ((image_height as f64) * (width as f64) / (image_width as f64)).round().max(1.0) as u32;

    let mut builder = GridBuilder::new(width, height, cell_size_m);
    let cells: Vec<_> = (0..height as i32)
        .flat_map(|i| (0..width as i32).map(move |j| furnigen::geom::Cell::new(j, i)))
        .collect();
    builder.insert_room("room", cells);
    builder.finish().expect("full-envelope fallback grid is always valid")
}

fn load_params(config_path: Option<&Path>) -> Result<OptimizerParams> {
    match config_path {
        Some(path) => {
            let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
            toml::from_str(&text).with_context(|| format!("parsing {} as TOML", path.display()))
        }
        None => Ok(OptimizerParams::default()),
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing {} as JSON", path.display()))
}
