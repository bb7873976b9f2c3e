//! VegScope CLI - cloud masking, spectral indices and composites for Sentinel-2 scenes

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use vegscope_algorithms::collection::{ImageCollection, Reducer};
use vegscope_algorithms::imagery::{
    CloudMaskParams, MsaviParams, Pipeline, RadicandPolicy, SpectralIndex,
};
use vegscope_core::image::properties::parse_datetime;
use vegscope_core::io::{read_scene, write_geotiff, write_scene};
use vegscope_core::{BBox, Image};

// ─── CLI structure ──────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "vegscope")]
#[command(author, version, about = "Vegetation and soil indices from Sentinel-2 scenes", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show bands, grid and properties of a scene
    Info {
        /// Scene manifest (JSON)
        scene: PathBuf,
    },
    /// Cloud mask a scene and scale it to reflectance
    Mask {
        /// Scene manifest (JSON)
        scene: PathBuf,
        /// Output directory, one GeoTIFF per band plus a scene manifest
        #[arg(short, long)]
        output: PathBuf,
        /// Divisor from digital numbers to reflectance
        #[arg(long, default_value = "10000")]
        scale: f64,
    },
    /// Compute spectral indices for a scene
    Index {
        /// Scene manifest (JSON)
        scene: PathBuf,
        /// Indices to compute: ndvi, ndmi, msavi, bsi
        #[arg(short, long, value_delimiter = ',', default_value = "ndvi")]
        indices: Vec<String>,
        /// Output directory, one GeoTIFF per index
        #[arg(short, long)]
        output: PathBuf,
        /// Skip cloud masking (input must already be reflectance)
        #[arg(long)]
        no_mask: bool,
        /// Clamp negative MSAVI radicands to zero instead of producing NaN
        #[arg(long)]
        clamp_msavi: bool,
    },
    /// Filter scenes, compute indices and reduce them into a composite
    Composite {
        /// Scene manifests (JSON)
        #[arg(required = true)]
        scenes: Vec<PathBuf>,
        /// Indices to compute: ndvi, ndmi, msavi, bsi
        #[arg(short, long, value_delimiter = ',', default_value = "ndvi")]
        indices: Vec<String>,
        /// Reducer: median, max, min, mean
        #[arg(short, long, default_value = "median")]
        reducer: String,
        /// First acquisition date to include (YYYY-MM-DD or RFC 3339)
        #[arg(long)]
        start: Option<String>,
        /// First acquisition date to exclude (YYYY-MM-DD or RFC 3339)
        #[arg(long)]
        end: Option<String>,
        /// Area of interest as west,south,east,north in the scenes' CRS
        #[arg(long)]
        bbox: Option<String>,
        /// Keep scenes with a cloud percentage strictly below this value
        #[arg(long)]
        max_cloud: Option<f64>,
        /// Output directory, one GeoTIFF per index
        #[arg(short, long)]
        output: PathBuf,
    },
}

// ─── Helpers ────────────────────────────────────────────────────────────

fn setup_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");
}

fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap(),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

fn load_scene(path: &Path) -> Result<Image> {
    let pb = spinner(&format!("Reading {}...", path.display()));
    let image = read_scene(path).with_context(|| format!("Failed to read scene {}", path.display()))?;
    pb.finish_and_clear();
    if let Some((rows, cols)) = image.shape() {
        info!("{}: {} bands, {} x {}", image.id(), image.band_count(), cols, rows);
    }
    Ok(image)
}

/// Write the named bands of `image` to `<dir>/<image id>_<band>.tif`.
fn write_bands<'a>(image: &Image, names: impl IntoIterator<Item = &'a str>, dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory {}", dir.display()))?;

    let pb = spinner("Writing output...");
    for name in names {
        let band = image.select(name)?;
        let path = dir.join(format!("{}_{}.tif", image.id(), name));
        write_geotiff(band, &path)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        println!("{} saved to: {}", name, path.display());
    }
    pb.finish_and_clear();
    Ok(())
}

fn done(name: &str, elapsed: std::time::Duration) {
    println!("{} finished", name);
    println!("  Processing time: {:.2?}", elapsed);
}

fn parse_indices(names: &[String]) -> Result<Vec<SpectralIndex>> {
    names
        .iter()
        .map(|s| s.parse::<SpectralIndex>().map_err(anyhow::Error::from))
        .collect()
}

fn parse_date(label: &str, value: Option<&str>) -> Result<Option<DateTime<Utc>>> {
    value
        .map(|s| {
            parse_datetime(s)
                .with_context(|| format!("Invalid {} date: {} (use YYYY-MM-DD)", label, s))
        })
        .transpose()
}

fn index_names(indices: &[SpectralIndex]) -> Vec<&'static str> {
    indices.iter().map(|idx| idx.name()).collect()
}

// ─── Main ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    match cli.command {
        // ── Info ─────────────────────────────────────────────────────
        Commands::Info { scene } => {
            let image = load_scene(&scene)?;

            println!("Scene: {}", image.id());
            if let Some((rows, cols)) = image.shape() {
                println!("Dimensions: {} x {} ({} cells)", cols, rows, rows * cols);
            }
            if let Some(bounds) = image.bounds() {
                println!(
                    "Bounds: ({:.6}, {:.6}) - ({:.6}, {:.6})",
                    bounds.west, bounds.south, bounds.east, bounds.north
                );
            }
            if let Some(transform) = image.transform() {
                println!("Cell size: {}", transform.cell_size());
            }
            if let Some(crs) = image.crs() {
                println!("CRS: {}", crs);
            }
            println!("Radiometry: {:?}", image.radiometry());

            println!("\nBands:");
            for (name, band) in image.bands() {
                let stats = band.statistics();
                println!(
                    "  {:<6} min {:>10.4}  max {:>10.4}  valid {:.1}%",
                    name,
                    stats.min.unwrap_or(f64::NAN),
                    stats.max.unwrap_or(f64::NAN),
                    100.0 * stats.valid_count as f64 / band.len().max(1) as f64
                );
            }

            if !image.properties().is_empty() {
                println!("\nProperties:");
                for (key, value) in image.properties() {
                    println!("  {}: {}", key, value);
                }
            }
        }

        // ── Mask ─────────────────────────────────────────────────────
        Commands::Mask {
            scene,
            output,
            scale,
        } => {
            let image = load_scene(&scene)?;
            let params = CloudMaskParams {
                scale_factor: scale,
                ..Default::default()
            };

            let start = Instant::now();
            let masked = Pipeline::new()
                .mask(params)
                .apply(&image)
                .context("Failed to mask clouds")?;
            let elapsed = start.elapsed();

            let pb = spinner("Writing output...");
            let manifest = write_scene(&masked, &output)
                .with_context(|| format!("Failed to write scene to {}", output.display()))?;
            pb.finish_and_clear();
            println!("Masked scene saved to: {}", manifest.display());
            done("Cloud mask", elapsed);
        }

        // ── Index ────────────────────────────────────────────────────
        Commands::Index {
            scene,
            indices,
            output,
            no_mask,
            clamp_msavi,
        } => {
            let indices = parse_indices(&indices)?;
            let image = load_scene(&scene)?;

            let mut pipeline = Pipeline::new().indices(indices.iter().copied());
            if no_mask {
                pipeline = pipeline.allow_unmasked();
            } else {
                pipeline = pipeline.mask(CloudMaskParams::default());
            }
            if clamp_msavi {
                pipeline = pipeline.msavi_params(MsaviParams {
                    radicand: RadicandPolicy::ClampZero,
                });
            }

            let start = Instant::now();
            let (result, warnings) = pipeline
                .apply_with_report(&image)
                .context("Failed to compute indices")?;
            let elapsed = start.elapsed();

            if !warnings.is_empty() {
                let pixels: usize = warnings.iter().map(|w| w.pixels).sum();
                println!("{} undefined pixels across {} indices", pixels, warnings.len());
            }
            write_bands(&result, index_names(&indices), &output)?;
            done("Indices", elapsed);
        }

        // ── Composite ────────────────────────────────────────────────
        Commands::Composite {
            scenes,
            indices,
            reducer,
            start,
            end,
            bbox,
            max_cloud,
            output,
        } => {
            let indices = parse_indices(&indices)?;
            let reducer: Reducer = reducer.parse()?;
            let start_date = parse_date("start", start.as_deref())?;
            let end_date = parse_date("end", end.as_deref())?;
            let bbox: Option<BBox> = bbox.as_deref().map(str::parse).transpose()?;

            let mut collection = scenes
                .iter()
                .map(|path| load_scene(path))
                .collect::<Result<ImageCollection>>()?;
            info!("Loaded {} scenes", collection.len());

            if start_date.is_some() || end_date.is_some() {
                collection = collection.filter_date(
                    start_date.unwrap_or(DateTime::<Utc>::MIN_UTC),
                    end_date.unwrap_or(DateTime::<Utc>::MAX_UTC),
                );
            }
            if let Some(bbox) = &bbox {
                collection = collection.filter_bounds(bbox);
            }
            if let Some(max_cloud) = max_cloud {
                collection = collection.filter_cloud_cover(max_cloud);
            }
            if collection.is_empty() {
                anyhow::bail!("No scenes left after filtering");
            }
            info!("{} scenes after filtering", collection.len());

            let timer = Instant::now();
            let processed = Pipeline::sentinel2(indices.iter().copied())
                .apply_collection(&collection)
                .context("Failed to preprocess scenes")?;
            let composite = processed
                .reduce(reducer)
                .context("Failed to build composite")?;
            let elapsed = timer.elapsed();

            write_bands(&composite, index_names(&indices), &output)?;
            done(&format!("{} composite", reducer), elapsed);
        }
    }

    Ok(())
}
