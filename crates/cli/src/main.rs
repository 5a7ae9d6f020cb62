//! Windfield CLI - station-based wind field interpolation and animation

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use windfield_algorithms::field_builder::{BuildStep, FieldBuilder, MAX_TASK_TIME, MIN_SLEEP_TIME};
use windfield_algorithms::interpolation::InverseDistanceWeighting;
use windfield_algorithms::overlay::{Overlay, OverlayBuilder, OverlayStep, Recipe, Scale};
use windfield_algorithms::particle::{ParticleAnimation, RenderSink, Segment};
use windfield_algorithms::samples::{
    scalar_points, wind_points, SampleSet, ScalarSample, StationDirectory, StationRow, WindSample,
};
use windfield_algorithms::settings::AnimationSettings;
use windfield_core::{DisplayBounds, Field};

// ─── CLI structure ──────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "windfield")]
#[command(author, version, about = "Station-based wind field interpolation and animation", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show information about a station directory and sample feed
    Info {
        /// Station directory JSON file
        stations: PathBuf,
        /// Wind sample feed JSON file
        samples: PathBuf,
    },
    /// Interpolate a vector field from wind samples
    Field {
        /// Station directory JSON file
        stations: PathBuf,
        /// Wind sample feed JSON file
        samples: PathBuf,
        /// Output JSON file
        output: PathBuf,
        /// Canvas width in pixels
        #[arg(long, default_value = "800")]
        width: i64,
        /// Canvas height in pixels
        #[arg(long, default_value = "600")]
        height: i64,
        /// Number of nearest stations blended per pixel
        #[arg(short, long, default_value = "5")]
        k: usize,
        /// Pixels of motion per frame for a 1 m/s wind; derived from the
        /// canvas height when omitted
        #[arg(long)]
        velocity_scale: Option<f64>,
    },
    /// Rasterize a scalar overlay from a sample feed
    Overlay {
        /// Station directory JSON file
        stations: PathBuf,
        /// Scalar sample feed JSON file
        samples: PathBuf,
        /// Output JSON file
        output: PathBuf,
        /// Canvas width in pixels
        #[arg(long, default_value = "800")]
        width: i64,
        /// Canvas height in pixels
        #[arg(long, default_value = "600")]
        height: i64,
        /// Smallest displayable value
        #[arg(long, default_value = "1.0")]
        min: f64,
        /// Largest displayable value
        #[arg(long, default_value = "20.0")]
        max: f64,
        /// Value-to-color mapping: linear, log
        #[arg(long, default_value = "log")]
        scale: String,
    },
    /// Run the particle animation headless and report frame statistics
    Animate {
        /// Station directory JSON file
        stations: PathBuf,
        /// Wind sample feed JSON file
        samples: PathBuf,
        /// Canvas width in pixels
        #[arg(long, default_value = "800")]
        width: i64,
        /// Canvas height in pixels
        #[arg(long, default_value = "600")]
        height: i64,
        /// Number of frames to run
        #[arg(short, long, default_value = "100")]
        frames: u32,
        /// RNG seed for reproducible runs
        #[arg(long)]
        seed: Option<u64>,
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

fn column_progress(total: i64, msg: &str) -> ProgressBar {
    let pb = ProgressBar::new(total.max(0) as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{msg} [{bar:40.green}] {pos}/{len} columns")
            .unwrap(),
    );
    pb.set_message(msg.to_string());
    pb
}

fn read_stations(path: &PathBuf) -> Result<StationDirectory> {
    let pb = spinner("Reading stations...");
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let rows: Vec<StationRow> = serde_json::from_str(&text).context("Invalid station JSON")?;
    pb.finish_and_clear();
    let directory = StationDirectory::from_rows(rows);
    info!("Stations: {}", directory.len());
    Ok(directory)
}

fn read_samples<S: serde::de::DeserializeOwned>(path: &PathBuf) -> Result<SampleSet<S>> {
    let pb = spinner("Reading samples...");
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let set: SampleSet<S> = serde_json::from_str(&text).context("Invalid sample JSON")?;
    pb.finish_and_clear();
    Ok(set)
}

/// Fit the station extent onto a width x height canvas, latitude
/// flipped so north is up, with a 5% margin on each side.
fn fit_projection(
    directory: &StationDirectory,
    width: i64,
    height: i64,
) -> impl Fn(f64, f64) -> (f64, f64) {
    let mut lng = (f64::INFINITY, f64::NEG_INFINITY);
    let mut lat = (f64::INFINITY, f64::NEG_INFINITY);
    for station in directory.stations() {
        lng = (lng.0.min(station.longitude), lng.1.max(station.longitude));
        lat = (lat.0.min(station.latitude), lat.1.max(station.latitude));
    }

    let margin = 0.05;
    let span = |lo: f64, hi: f64| if hi > lo { hi - lo } else { 1.0 };
    let (lng0, lng_span) = (lng.0, span(lng.0, lng.1));
    let (lat1, lat_span) = (lat.1, span(lat.0, lat.1));
    let (w, h) = (width as f64, height as f64);

    move |lng: f64, lat: f64| {
        let fx = (lng - lng0) / lng_span;
        let fy = (lat1 - lat) / lat_span;
        (
            (margin + fx * (1.0 - 2.0 * margin)) * w,
            (margin + fy * (1.0 - 2.0 * margin)) * h,
        )
    }
}

fn write_json<T: Serialize>(value: &T, path: &PathBuf) -> Result<()> {
    let pb = spinner("Writing output...");
    let text = serde_json::to_string(value).context("Failed to serialize output")?;
    std::fs::write(path, text).with_context(|| format!("Failed to write {}", path.display()))?;
    pb.finish_and_clear();
    Ok(())
}

fn done(name: &str, path: &PathBuf, elapsed: std::time::Duration) {
    println!("{} saved to: {}", name, path.display());
    println!("  Processing time: {:.2?}", elapsed);
}

fn parse_scale(s: &str) -> Result<Scale> {
    match s.to_lowercase().as_str() {
        "linear" | "lin" => Ok(Scale::Linear),
        "log" | "logarithmic" => Ok(Scale::Logarithmic),
        _ => anyhow::bail!("Unknown scale: {}. Use linear or log.", s),
    }
}

/// Drive a field build the way a host event loop would: one batch per
/// tick, resting between batches.
fn build_field_batched<I, FM, DM>(task: FieldBuilder<I, FM, DM>, pb: &ProgressBar) -> Field
where
    I: windfield_algorithms::interpolation::Interpolate<Value = windfield_core::Vector2>,
    FM: Fn(i64, i64) -> bool,
    DM: Fn(i64, i64) -> bool,
{
    let mut task = task;
    loop {
        match task.advance(MAX_TASK_TIME) {
            BuildStep::Continue(next) => {
                pb.set_position(next.columns_done().max(0) as u64);
                std::thread::sleep(MIN_SLEEP_TIME);
                task = next;
            }
            BuildStep::Done(field) => {
                pb.finish_and_clear();
                return field;
            }
        }
    }
}

fn build_overlay_batched<I, DM>(task: OverlayBuilder<I, DM>, pb: &ProgressBar) -> Overlay
where
    I: windfield_algorithms::interpolation::Interpolate<Value = f64>,
    DM: Fn(i64, i64) -> bool,
{
    let mut task = task;
    loop {
        match task.advance(MAX_TASK_TIME) {
            OverlayStep::Continue(next) => {
                pb.set_position(next.columns_done().max(0) as u64);
                std::thread::sleep(MIN_SLEEP_TIME);
                task = next;
            }
            OverlayStep::Done(overlay) => {
                pb.finish_and_clear();
                return overlay;
            }
        }
    }
}

// ─── Output shapes ──────────────────────────────────────────────────────

#[derive(Serialize)]
struct FieldCell {
    x: i64,
    y: i64,
    dx: f64,
    dy: f64,
    magnitude: f64,
}

#[derive(Serialize)]
struct FieldOutput {
    date: Option<String>,
    bounds: DisplayBounds,
    velocity_scale: f64,
    cells: Vec<FieldCell>,
}

#[derive(Serialize)]
struct OverlayOutput {
    date: Option<String>,
    bounds: DisplayBounds,
    overlay: Overlay,
}

fn flatten_field(field: &Field, bounds: &DisplayBounds) -> Vec<FieldCell> {
    let mut cells = Vec::with_capacity(field.valid_cell_count());
    for x in bounds.x..bounds.x_max() {
        for y in bounds.y..bounds.y_max() {
            let v = field.get(x as f64, y as f64);
            if !v.is_nil() {
                cells.push(FieldCell {
                    x,
                    y,
                    dx: v.dx,
                    dy: v.dy,
                    magnitude: v.magnitude,
                });
            }
        }
    }
    cells
}

/// Sink that only counts, for headless animation runs.
#[derive(Default)]
struct StatsSink {
    segments: usize,
    buckets: usize,
    frames: usize,
}

impl RenderSink for StatsSink {
    fn fade(&mut self, _bounds: DisplayBounds) {}

    fn stroke_bucket(&mut self, _style: usize, segments: &[Segment]) {
        self.segments += segments.len();
        self.buckets += 1;
    }

    fn repaint(&mut self) {
        self.frames += 1;
    }
}

// ─── Main ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    match cli.command {
        // ── Info ─────────────────────────────────────────────────────
        Commands::Info { stations, samples } => {
            let directory = read_stations(&stations)?;
            let set: SampleSet<WindSample> = read_samples(&samples)?;

            let valid = set.samples.iter().filter(|s| s.wind().is_some()).count();
            let known = set
                .samples
                .iter()
                .filter(|s| directory.get(s.station_id).is_some())
                .count();

            println!("Stations: {}", directory.len());
            if let Some(date) = &set.date {
                println!("Sample date: {}", date);
            }
            println!("Samples: {}", set.samples.len());
            println!("  Valid wind readings: {}", valid);
            println!("  From known stations: {}", known);
        }

        // ── Field ────────────────────────────────────────────────────
        Commands::Field {
            stations,
            samples,
            output,
            width,
            height,
            k,
            velocity_scale,
        } => {
            let directory = read_stations(&stations)?;
            let set: SampleSet<WindSample> = read_samples(&samples)?;

            let bounds = DisplayBounds::new(0, 0, width, height);
            let velocity_scale = velocity_scale
                .unwrap_or_else(|| AnimationSettings::derive(&bounds).velocity_scale);

            let project = fit_projection(&directory, width, height);
            let points = wind_points(&directory, &set.samples, &project)
                .context("No usable wind samples")?;
            info!("Interpolating from {} stations", points.len());

            let idw = InverseDistanceWeighting::new(points, k)
                .context("Failed to build interpolator")?;

            let start = Instant::now();
            let builder =
                FieldBuilder::new(idw, bounds, |_, _| true, |_, _| true, velocity_scale);
            let pb = column_progress(builder.columns_total(), "Building field");
            let field = build_field_batched(builder, &pb);
            let elapsed = start.elapsed();
            info!("Field cells: {}", field.valid_cell_count());

            let result = FieldOutput {
                date: set.date,
                bounds,
                velocity_scale,
                cells: flatten_field(&field, &bounds),
            };
            write_json(&result, &output)?;
            done("Field", &output, elapsed);
        }

        // ── Overlay ──────────────────────────────────────────────────
        Commands::Overlay {
            stations,
            samples,
            output,
            width,
            height,
            min,
            max,
            scale,
        } => {
            let directory = read_stations(&stations)?;
            let set: SampleSet<ScalarSample> = read_samples(&samples)?;
            let recipe = Recipe::new(min, max, parse_scale(&scale)?);

            let bounds = DisplayBounds::new(0, 0, width, height);
            let project = fit_projection(&directory, width, height);
            let points = scalar_points(&directory, &set.samples, &project)
                .context("No usable scalar samples")?;
            info!("Fitting spline to {} stations", points.len());

            let start = Instant::now();
            let builder =
                OverlayBuilder::thin_plate_spline(points, recipe, bounds, |_, _| true)
                    .context("Failed to fit spline")?;
            let pb = column_progress(builder.columns_total(), "Building overlay");
            let overlay = build_overlay_batched(builder, &pb);
            let elapsed = start.elapsed();
            info!("Overlay cells: {}", overlay.cells.len());

            let result = OverlayOutput {
                date: set.date,
                bounds,
                overlay,
            };
            write_json(&result, &output)?;
            done("Overlay", &output, elapsed);
        }

        // ── Animate ──────────────────────────────────────────────────
        Commands::Animate {
            stations,
            samples,
            width,
            height,
            frames,
            seed,
        } => {
            let directory = read_stations(&stations)?;
            let set: SampleSet<WindSample> = read_samples(&samples)?;

            let bounds = DisplayBounds::new(0, 0, width, height);
            let settings = AnimationSettings::derive(&bounds);

            let project = fit_projection(&directory, width, height);
            let points = wind_points(&directory, &set.samples, &project)
                .context("No usable wind samples")?;
            let idw = InverseDistanceWeighting::new(points, 5)
                .context("Failed to build interpolator")?;

            let builder =
                FieldBuilder::new(idw, bounds, |_, _| true, |_, _| true, settings.velocity_scale);
            let pb = column_progress(builder.columns_total(), "Building field");
            let field = build_field_batched(builder, &pb);

            info!(
                "Animating {} particles for {} frames",
                settings.particle_count, frames
            );
            let rng = StdRng::seed_from_u64(seed.unwrap_or(0));
            let frame_interval = settings.frame_interval;
            let (mut animation, handle) = ParticleAnimation::start(settings, bounds, field, rng);

            let mut sink = StatsSink::default();
            let start = Instant::now();
            for i in 0..frames {
                let tick = Instant::now();
                animation.frame(&mut sink);
                if i + 1 < frames {
                    std::thread::sleep(frame_interval.saturating_sub(tick.elapsed()));
                }
            }
            handle.stop();
            let elapsed = start.elapsed();

            println!("Frames drawn: {}", sink.frames);
            println!("Segments stroked: {}", sink.segments);
            println!("Bucket strokes: {}", sink.buckets);
            println!("  Wall time: {:.2?}", elapsed);
        }
    }

    Ok(())
}
