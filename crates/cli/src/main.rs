//! Vectis CLI - vector analysis and classification on GeoJSON layers

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use geo_types::Geometry;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use vectis_algorithms::classification::{categorize, classify_graduated, ClassificationMethod};
use vectis_algorithms::demography::project_features;
use vectis_algorithms::statistics::{correlate, describe};
use vectis_algorithms::trajectory::{
    cluster_vectors, coherence, displacement_vectors, parse_timestamp, track_features,
    ClusterParams, CoherenceParams, CoherenceScope, TrackingParams, VectorParams,
};
use vectis_algorithms::vector::{
    bezier_smooth, buffer_features, clip, concave_hull, convex_hull, cross_sections, dissolve,
    erase, measure_features, merge_layers, suggest_concavity, total_area, BezierParams,
    BufferParams, ConcaveHullParams, CrossSectionParams, DissolveParams,
};
use vectis_colormap::{parse_hex, Ramp};
use vectis_core::io::{read_geojson, write_geojson};
use vectis_core::{AnalysisReport, FeatureCollection, FeatureId, LinearUnit, Selection};

// ─── CLI structure ──────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "vectis")]
#[command(author, version, about = "Vector analysis and classification for GeoJSON layers", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show information about a GeoJSON layer
    Info {
        /// Input GeoJSON file
        input: PathBuf,
    },
    /// Classify a field for symbology
    Classify {
        #[command(subcommand)]
        method: ClassifyCommands,
    },
    /// Add area, length and perimeter attributes
    Measure {
        input: PathBuf,
        output: PathBuf,
        /// Unit of the measurements: m, km, mi
        #[arg(short, long, default_value = "m")]
        unit: LinearUnit,
    },
    /// Buffer features by a fixed distance (negative shrinks polygons)
    Buffer {
        input: PathBuf,
        output: PathBuf,
        #[arg(short, long, allow_hyphen_values = true)]
        distance: f64,
        #[arg(short, long, default_value = "m")]
        unit: LinearUnit,
        /// Segments per full circle
        #[arg(long, default_value = "16")]
        segments: usize,
        #[command(flatten)]
        select: SelectArgs,
    },
    /// Keep the parts of features inside a polygon mask
    Clip {
        input: PathBuf,
        mask: PathBuf,
        output: PathBuf,
        #[command(flatten)]
        select: SelectArgs,
    },
    /// Remove the parts of features inside a polygon mask
    Erase {
        input: PathBuf,
        mask: PathBuf,
        output: PathBuf,
        #[command(flatten)]
        select: SelectArgs,
    },
    /// Convex and concave hulls
    Hull {
        #[command(subcommand)]
        kind: HullCommands,
    },
    /// Union polygons, optionally grouped by a field
    Dissolve {
        input: PathBuf,
        output: PathBuf,
        #[arg(short, long)]
        group_by: Option<String>,
        #[command(flatten)]
        select: SelectArgs,
    },
    /// Concatenate layers under a shared attribute schema
    Merge {
        output: PathBuf,
        #[arg(required = true, num_args = 2..)]
        inputs: Vec<PathBuf>,
    },
    /// Bezier-smooth lines and polygon rings
    Smooth {
        input: PathBuf,
        output: PathBuf,
        /// Points per input segment
        #[arg(short, long, default_value = "10")]
        resolution: usize,
        /// Curviness between 0 and 1
        #[arg(short, long, default_value = "0.85")]
        sharpness: f64,
        #[command(flatten)]
        select: SelectArgs,
    },
    /// Perpendicular cross-sections along a line
    CrossSections {
        input: PathBuf,
        output: PathBuf,
        /// Distance between stations
        #[arg(short, long, default_value = "100")]
        interval: f64,
        /// Total length of each section
        #[arg(short, long, default_value = "50")]
        length: f64,
        #[arg(short, long, default_value = "m")]
        unit: LinearUnit,
        /// Id of the line feature (default: first feature)
        #[arg(long)]
        line: Option<String>,
    },
    /// Displacement vectors between two point snapshots (lon/lat)
    Vectors {
        source: PathBuf,
        target: PathBuf,
        output: PathBuf,
        #[arg(short, long, default_value = "10")]
        radius_km: f64,
        #[command(flatten)]
        time: TimeArgs,
    },
    /// DBSCAN clustering of displacement vectors
    Cluster {
        input: PathBuf,
        output: PathBuf,
        /// Standard deviations of nearest-neighbour distance added to the mean
        #[arg(short, long, default_value = "1.0")]
        multiplier: f64,
        #[arg(long, default_value = "2")]
        min_points: usize,
    },
    /// Label vectors as coherent, moderate, outlier or isolated
    Coherence {
        input: PathBuf,
        output: PathBuf,
        /// Numeric field holding the vector magnitude
        #[arg(long, default_value = "distance")]
        magnitude_field: String,
        /// Score against per-cluster statistics instead of the whole layer
        #[arg(long)]
        per_cluster: bool,
        /// Clustering multiplier used with --per-cluster
        #[arg(short, long, default_value = "1.0")]
        multiplier: f64,
    },
    /// Match features between two snapshots (lon/lat)
    Track {
        t1: PathBuf,
        t2: PathBuf,
        output: PathBuf,
        #[arg(short = 'd', long, default_value = "10")]
        max_distance_km: f64,
        /// Numeric field that should stay similar along a track
        #[arg(short, long)]
        attribute: Option<String>,
        /// Largest accepted relative change of the attribute
        #[arg(long, default_value = "0.5")]
        tolerance: f64,
        #[command(flatten)]
        time: TimeArgs,
    },
    /// Project population from three census fields
    Project {
        input: PathBuf,
        output: PathBuf,
        /// Census fields, oldest first: a,b,c
        #[arg(short, long, value_delimiter = ',', required = true)]
        fields: Vec<String>,
        /// Census years matching the fields: 2001,2010,2022
        #[arg(short, long, value_delimiter = ',', required = true)]
        years: Vec<i32>,
        #[arg(short, long)]
        target: i32,
    },
    /// Descriptive statistics of a numeric field
    Stats {
        input: PathBuf,
        field: String,
        /// Second field to correlate against
        #[arg(long)]
        against: Option<String>,
    },
}

#[derive(Subcommand)]
enum ClassifyCommands {
    /// Classes holding roughly equal numbers of features
    Quantile {
        #[command(flatten)]
        args: SymbologyArgs,
        #[arg(short = 'k', long, default_value = "5")]
        classes: usize,
    },
    /// Fisher-Jenks natural breaks
    Jenks {
        #[command(flatten)]
        args: SymbologyArgs,
        #[arg(short = 'k', long, default_value = "5")]
        classes: usize,
    },
    /// One category per distinct value
    Unique {
        #[command(flatten)]
        args: SymbologyArgs,
    },
}

#[derive(Subcommand)]
enum HullCommands {
    /// Smallest convex polygon around all vertices
    Convex {
        input: PathBuf,
        output: PathBuf,
        #[command(flatten)]
        select: SelectArgs,
    },
    /// Union of Delaunay triangles with short edges
    Concave {
        input: PathBuf,
        output: PathBuf,
        /// Maximum edge length (default: suggested from the data)
        #[arg(short, long)]
        concavity: Option<f64>,
        #[arg(short, long, default_value = "m")]
        unit: LinearUnit,
        #[command(flatten)]
        select: SelectArgs,
    },
    /// Suggest a concavity from nearest-neighbour distances
    Suggest {
        input: PathBuf,
        #[arg(short, long, default_value = "m")]
        unit: LinearUnit,
    },
}

#[derive(Args)]
struct SymbologyArgs {
    input: PathBuf,
    output: PathBuf,
    /// Field to classify
    #[arg(short, long)]
    field: String,
    #[arg(long, default_value = "#ffffb2")]
    start_color: String,
    #[arg(long, default_value = "#bd0026")]
    end_color: String,
}

#[derive(Args)]
struct SelectArgs {
    /// Comma-separated feature ids to restrict the analysis to
    #[arg(long, value_delimiter = ',')]
    select: Vec<String>,
}

#[derive(Args)]
struct TimeArgs {
    /// Time of the first snapshot (RFC 3339 or "YYYY-MM-DD HH:MM")
    #[arg(long)]
    start: Option<String>,
    /// Time of the second snapshot
    #[arg(long)]
    end: Option<String>,
}

// ─── Helpers ────────────────────────────────────────────────────────────

fn setup_logging(verbose: bool) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("setting default subscriber failed")
}

fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

fn read_layer(path: &Path) -> Result<FeatureCollection> {
    let pb = spinner("Reading layer...");
    let layer = read_geojson(path).with_context(|| format!("Failed to read {}", path.display()))?;
    pb.finish_and_clear();
    info!("Input: {} features from {}", layer.len(), path.display());
    Ok(layer)
}

fn write_layer(layer: &FeatureCollection, path: &Path) -> Result<()> {
    let pb = spinner("Writing output...");
    write_geojson(layer, path).context("Failed to write output")?;
    pb.finish_and_clear();
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn done(name: &str, path: &Path, count: usize, elapsed: std::time::Duration) {
    println!("{} saved to: {} ({} features)", name, path.display(), count);
    println!("  Processing time: {:.2?}", elapsed);
}

fn warn_skipped<T>(op: &str, report: &AnalysisReport<T>) {
    if report.is_partial() {
        warn!("{}: {} of {} features skipped", op, report.skipped.len(), report.processed);
    }
}

impl SelectArgs {
    fn selection(&self, layer: &FeatureCollection) -> Option<Selection> {
        if self.select.is_empty() {
            return None;
        }
        let name = layer.name.clone().unwrap_or_default();
        Some(Selection::new(name, self.select.iter().map(|id| FeatureId::from(id.as_str()))))
    }
}

impl SymbologyArgs {
    fn ramp(&self) -> Result<Ramp> {
        let start = parse_hex(&self.start_color).with_context(|| format!("Invalid colour: {}", self.start_color))?;
        let end = parse_hex(&self.end_color).with_context(|| format!("Invalid colour: {}", self.end_color))?;
        Ok(Ramp::new(start, end))
    }
}

impl TimeArgs {
    fn parse(&self) -> Result<(Option<DateTime<Utc>>, Option<DateTime<Utc>>)> {
        let start = self.start.as_deref().map(parse_timestamp).transpose()?;
        let end = self.end.as_deref().map(parse_timestamp).transpose()?;
        Ok((start, end))
    }
}

fn geometry_kind(g: &Geometry<f64>) -> &'static str {
    match g {
        Geometry::Point(_) => "Point",
        Geometry::Line(_) => "Line",
        Geometry::LineString(_) => "LineString",
        Geometry::Polygon(_) => "Polygon",
        Geometry::MultiPoint(_) => "MultiPoint",
        Geometry::MultiLineString(_) => "MultiLineString",
        Geometry::MultiPolygon(_) => "MultiPolygon",
        Geometry::GeometryCollection(_) => "GeometryCollection",
        Geometry::Rect(_) => "Rect",
        Geometry::Triangle(_) => "Triangle",
    }
}

// ─── Main ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose)?;

    match cli.command {
        // ── Info ─────────────────────────────────────────────────────
        Commands::Info { input } => {
            let layer = read_layer(&input)?;
            let mut kinds: BTreeMap<&str, usize> = BTreeMap::new();
            for f in layer.iter() {
                let kind = f.geometry.as_ref().map(geometry_kind).unwrap_or("None");
                *kinds.entry(kind).or_default() += 1;
            }

            println!("File: {}", input.display());
            println!("Layer: {}", layer.name.as_deref().unwrap_or("-"));
            println!("Features: {}", layer.len());
            println!("\nGeometry:");
            for (kind, count) in &kinds {
                println!("  {}: {}", kind, count);
            }
            println!("  Total area: {:.4}", total_area(&layer));
            println!("\nAttributes:");
            let numeric = layer.numeric_fields();
            for key in layer.attribute_keys() {
                let tag = if numeric.contains(&key) { " (numeric)" } else { "" };
                println!("  {}{}", key, tag);
            }
        }

        // ── Classification ───────────────────────────────────────────
        Commands::Classify { method } => {
            let (args, method, classes) = match method {
                ClassifyCommands::Quantile { args, classes } => (args, Some(ClassificationMethod::Quantile), classes),
                ClassifyCommands::Jenks { args, classes } => (args, Some(ClassificationMethod::NaturalBreaks), classes),
                ClassifyCommands::Unique { args } => (args, None, 0),
            };
            let ramp = args.ramp()?;
            let layer = read_layer(&args.input)?;
            let start = Instant::now();
            let styled = match method {
                Some(method) => {
                    let classes = classify_graduated(&layer, &args.field, method, classes, &ramp)
                        .context("Failed to classify")?;
                    print_json(&classes)?;
                    classes.symbolize(&layer)
                }
                None => {
                    let categories = categorize(&layer, &args.field, &ramp).context("Failed to categorize")?;
                    print_json(&categories)?;
                    categories.symbolize(&layer)
                }
            };
            let elapsed = start.elapsed();
            write_layer(&styled, &args.output)?;
            done("Classification", &args.output, styled.len(), elapsed);
        }

        // ── Geometry ─────────────────────────────────────────────────
        Commands::Measure { input, output, unit } => {
            let layer = read_layer(&input)?;
            let start = Instant::now();
            let measured = measure_features(&layer, unit);
            let elapsed = start.elapsed();
            write_layer(&measured, &output)?;
            done("Measurements", &output, measured.len(), elapsed);
        }

        Commands::Buffer { input, output, distance, unit, segments, select } => {
            let layer = read_layer(&input)?;
            let selection = select.selection(&layer);
            let start = Instant::now();
            let report = buffer_features(&layer, &BufferParams { distance, unit, segments }, selection.as_ref())
                .context("Failed to buffer")?;
            let elapsed = start.elapsed();
            warn_skipped("buffer", &report);
            write_layer(&report.output, &output)?;
            done("Buffer", &output, report.output.len(), elapsed);
        }

        Commands::Clip { input, mask, output, select } => {
            let layer = read_layer(&input)?;
            let mask = read_layer(&mask)?;
            let selection = select.selection(&layer);
            let start = Instant::now();
            let report = clip(&layer, &mask, selection.as_ref()).context("Failed to clip")?;
            let elapsed = start.elapsed();
            warn_skipped("clip", &report);
            write_layer(&report.output, &output)?;
            done("Clip", &output, report.output.len(), elapsed);
        }

        Commands::Erase { input, mask, output, select } => {
            let layer = read_layer(&input)?;
            let mask = read_layer(&mask)?;
            let selection = select.selection(&layer);
            let start = Instant::now();
            let report = erase(&layer, &mask, selection.as_ref()).context("Failed to erase")?;
            let elapsed = start.elapsed();
            warn_skipped("erase", &report);
            write_layer(&report.output, &output)?;
            done("Erase", &output, report.output.len(), elapsed);
        }

        Commands::Hull { kind } => match kind {
            HullCommands::Convex { input, output, select } => {
                let layer = read_layer(&input)?;
                let selection = select.selection(&layer);
                let start = Instant::now();
                let report = convex_hull(&layer, selection.as_ref()).context("Failed to build convex hull")?;
                let elapsed = start.elapsed();
                warn_skipped("convex hull", &report);
                let hull = FeatureCollection::named("convex_hull", vec![report.output]);
                write_layer(&hull, &output)?;
                done("Convex hull", &output, 1, elapsed);
            }
            HullCommands::Concave { input, output, concavity, unit, select } => {
                let layer = read_layer(&input)?;
                let selection = select.selection(&layer);
                let start = Instant::now();
                let concavity = match concavity {
                    Some(c) => c,
                    None => {
                        let suggestion = suggest_concavity(&layer, unit, selection.as_ref())
                            .context("Failed to suggest a concavity")?;
                        info!("Using suggested concavity {:.3} {}", suggestion.suggested, unit);
                        suggestion.suggested
                    }
                };
                let report = concave_hull(&layer, &ConcaveHullParams { concavity, unit }, selection.as_ref())
                    .context("Failed to build concave hull")?;
                let elapsed = start.elapsed();
                warn_skipped("concave hull", &report);
                let hull = FeatureCollection::named("concave_hull", vec![report.output]);
                write_layer(&hull, &output)?;
                done("Concave hull", &output, 1, elapsed);
            }
            HullCommands::Suggest { input, unit } => {
                let layer = read_layer(&input)?;
                let suggestion = suggest_concavity(&layer, unit, None).context("Failed to suggest a concavity")?;
                print_json(&suggestion)?;
            }
        },

        // ── Aggregation ──────────────────────────────────────────────
        Commands::Dissolve { input, output, group_by, select } => {
            let layer = read_layer(&input)?;
            let selection = select.selection(&layer);
            let start = Instant::now();
            let report = dissolve(&layer, &DissolveParams { group_by }, selection.as_ref())
                .context("Failed to dissolve")?;
            let elapsed = start.elapsed();
            warn_skipped("dissolve", &report);
            write_layer(&report.output, &output)?;
            done("Dissolve", &output, report.output.len(), elapsed);
        }

        Commands::Merge { output, inputs } => {
            let layers = inputs
                .iter()
                .map(|p| read_layer(p))
                .collect::<Result<Vec<_>>>()?;
            let start = Instant::now();
            let merged = merge_layers(&layers).context("Failed to merge layers")?;
            let elapsed = start.elapsed();
            write_layer(&merged, &output)?;
            done("Merge", &output, merged.len(), elapsed);
        }

        // ── Generalization ───────────────────────────────────────────
        Commands::Smooth { input, output, resolution, sharpness, select } => {
            let layer = read_layer(&input)?;
            let selection = select.selection(&layer);
            let start = Instant::now();
            let report = bezier_smooth(&layer, &BezierParams { resolution, sharpness }, selection.as_ref())
                .context("Failed to smooth")?;
            let elapsed = start.elapsed();
            warn_skipped("smooth", &report);
            write_layer(&report.output, &output)?;
            done("Smooth", &output, report.output.len(), elapsed);
        }

        Commands::CrossSections { input, output, interval, length, unit, line } => {
            let layer = read_layer(&input)?;
            let feature = match &line {
                Some(id) => layer
                    .get(&FeatureId::from(id.as_str()))
                    .with_context(|| format!("No feature with id {}", id))?,
                None => layer.features.first().context("Input layer is empty")?,
            };
            let params = CrossSectionParams { station_interval: interval, section_length: length, unit };
            let start = Instant::now();
            let sections = cross_sections(feature, &params).context("Failed to build cross-sections")?;
            let elapsed = start.elapsed();
            write_layer(&sections, &output)?;
            done("Cross-sections", &output, sections.len(), elapsed);
        }

        // ── Trajectories ─────────────────────────────────────────────
        Commands::Vectors { source, target, output, radius_km, time } => {
            let (start_time, end_time) = time.parse()?;
            let source = read_layer(&source)?;
            let target = read_layer(&target)?;
            let params = VectorParams { search_radius_km: radius_km, start_time, end_time };
            let start = Instant::now();
            let report = displacement_vectors(&source, &target, &params, None)
                .context("Failed to build displacement vectors")?;
            let elapsed = start.elapsed();
            warn_skipped("vectors", &report);
            write_layer(&report.output, &output)?;
            done("Vectors", &output, report.output.len(), elapsed);
        }

        Commands::Cluster { input, output, multiplier, min_points } => {
            let layer = read_layer(&input)?;
            let start = Instant::now();
            let report = cluster_vectors(&layer, &ClusterParams { multiplier, min_points }, None)
                .context("Failed to cluster vectors")?;
            let elapsed = start.elapsed();
            warn_skipped("cluster", &report);
            let clusters = &report.output;
            println!(
                "{} clusters, {} noise vectors (eps {:.1} m)",
                clusters.cluster_count,
                clusters.noise_count(),
                clusters.eps_m
            );
            let labelled = clusters.label(&layer);
            write_layer(&labelled, &output)?;
            done("Clusters", &output, labelled.len(), elapsed);
        }

        Commands::Coherence { input, output, magnitude_field, per_cluster, multiplier } => {
            let layer = read_layer(&input)?;
            let start = Instant::now();
            let scope = if per_cluster {
                let clusters = cluster_vectors(&layer, &ClusterParams { multiplier, ..Default::default() }, None)
                    .context("Failed to cluster vectors")?;
                CoherenceScope::PerCluster(clusters.output.assignment)
            } else {
                CoherenceScope::Global
            };
            let report = coherence(&layer, &CoherenceParams { magnitude_field, scope }, None)
                .context("Failed to score coherence")?;
            let elapsed = start.elapsed();
            warn_skipped("coherence", &report);
            print_json(&report.output.groups)?;
            let labelled = report.output.label(&layer);
            write_layer(&labelled, &output)?;
            done("Coherence", &output, labelled.len(), elapsed);
        }

        Commands::Track { t1, t2, output, max_distance_km, attribute, tolerance, time } => {
            let (start_time, end_time) = time.parse()?;
            let t1 = read_layer(&t1)?;
            let t2 = read_layer(&t2)?;
            let params = TrackingParams {
                max_distance_km,
                attribute,
                attribute_tolerance: tolerance,
                start_time,
                end_time,
            };
            let start = Instant::now();
            let report = track_features(&t1, &t2, &params, None).context("Failed to track features")?;
            let elapsed = start.elapsed();
            warn_skipped("track", &report);
            write_layer(&report.output, &output)?;
            done("Tracks", &output, report.output.len(), elapsed);
        }

        // ── Demography ───────────────────────────────────────────────
        Commands::Project { input, output, fields, years, target } => {
            let (fields, years): ([String; 3], [i32; 3]) = match (fields.try_into(), years.try_into()) {
                (Ok(f), Ok(y)) => (f, y),
                _ => bail!("--fields and --years take exactly three comma-separated values"),
            };
            let layer = read_layer(&input)?;
            let field_refs = [fields[0].as_str(), fields[1].as_str(), fields[2].as_str()];
            let start = Instant::now();
            let report = project_features(&layer, field_refs, years, target, None)
                .context("Failed to project population")?;
            let elapsed = start.elapsed();
            warn_skipped("project", &report);
            write_layer(&report.output, &output)?;
            done("Projection", &output, report.output.len(), elapsed);
        }

        // ── Statistics ───────────────────────────────────────────────
        Commands::Stats { input, field, against } => {
            let layer = read_layer(&input)?;
            match against {
                None => {
                    let values: Vec<f64> = layer.iter().filter_map(|f| f.numeric(&field)).collect();
                    let stats = describe(&values).with_context(|| format!("No numeric values in '{}'", field))?;
                    print_json(&stats)?;
                }
                Some(other) => {
                    let (xs, ys): (Vec<f64>, Vec<f64>) = layer
                        .iter()
                        .filter_map(|f| Some((f.numeric(&field)?, f.numeric(&other)?)))
                        .unzip();
                    let c = correlate(&xs, &ys).with_context(|| format!("Cannot correlate '{}' with '{}'", field, other))?;
                    print_json(&c)?;
                }
            }
        }
    }

    Ok(())
}
