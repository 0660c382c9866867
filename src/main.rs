use std::error::Error;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use crossroute::{
    Cancellable, CrossBorderGraph, CrossMwmTransitions, EdgeEstimator, LatLon, RoadGeometry, Router,
    RoutingSettings, WeightKind, WorldGraph, WorldGraphMode,
};

#[derive(Debug, thiserror::Error)]
#[error("{0}: {1}")]
struct RegionLoadError(PathBuf, #[source] crossroute::osm::Error);

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Model {
    Car,
    Bicycle,
    Foot,
}

impl Model {
    fn vehicle(self) -> &'static crossroute::osm::VehicleModel<'static> {
        match self {
            Self::Car => &crossroute::osm::CAR_MODEL,
            Self::Bicycle => &crossroute::osm::BICYCLE_MODEL,
            Self::Foot => &crossroute::osm::FOOT_MODEL,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Mode {
    SingleMwm,
    NoLeaps,
    Joints,
    JointSingleMwm,
}

impl From<Mode> for WorldGraphMode {
    fn from(m: Mode) -> Self {
        match m {
            Mode::SingleMwm => Self::SingleMwm,
            Mode::NoLeaps => Self::NoLeaps,
            Mode::Joints => Self::Joints,
            Mode::JointSingleMwm => Self::JointSingleMwm,
        }
    }
}

#[derive(Parser)]
struct Cli {
    /// Paths to OSM files, each loaded as a separate region named after the file
    #[arg(short, long = "region", required = true)]
    regions: Vec<PathBuf>,

    /// Vehicle model used to interpret the OSM data
    #[arg(long, value_enum, default_value_t = Model::Car)]
    model: Model,

    /// Graph used by the search
    #[arg(long, value_enum, default_value_t = Mode::Joints)]
    mode: Mode,

    /// Use the unidirectional A* instead of the bidirectional one
    #[arg(long)]
    unidirectional: bool,

    /// Give up the search after that many seconds
    #[arg(long)]
    timeout: Option<f64>,

    /// Read the cross-border graph from this file instead of building it
    #[arg(long)]
    load_cross_border: Option<PathBuf>,

    /// Write the cross-border graph to this file
    #[arg(long)]
    save_cross_border: Option<PathBuf>,

    /// Latitude of the start point
    start_lat: f64,

    /// Longitude of the start point
    start_lon: f64,

    /// Latitude of the end point
    end_lat: f64,

    /// Longitude of the end point
    end_lon: f64,
}

pub fn main() -> Result<(), Box<dyn Error>> {
    colog::init();
    let cli = Cli::parse();

    let mut geometry = RoadGeometry::default();
    for path in &cli.regions {
        load_region(&mut geometry, cli.model.vehicle(), path)?;
    }
    let geometry = Arc::new(geometry);

    let settings = RoutingSettings {
        mode: cli.mode.into(),
        bidirectional: !cli.unidirectional,
        ..RoutingSettings::default()
    };
    let transitions = Arc::new(CrossMwmTransitions::detect(geometry.as_ref()));
    let estimator = EdgeEstimator::new(WeightKind::Time, cli.model.vehicle().max_speed_kmph());
    let mut world = WorldGraph::new(geometry.clone(), transitions, estimator, &settings);

    let cross_border = match &cli.load_cross_border {
        Some(path) => CrossBorderGraph::deserialize(BufReader::new(File::open(path)?), geometry.as_ref())?,
        None => CrossBorderGraph::build(&world),
    };
    if let Some(path) = &cli.save_cross_border {
        cross_border.serialize(BufWriter::new(File::create(path)?), geometry.as_ref())?;
    }
    world = world.with_cross_border_graph(Arc::new(cross_border));

    let index = crossroute::kd::RoadIndex::build(geometry.as_ref()).ok_or("no roads were loaded")?;
    let cancellable = match cli.timeout {
        Some(seconds) => Cancellable::with_timeout(Duration::from_secs_f64(seconds)),
        None => Cancellable::default(),
    };

    let mut router = Router::new(world, settings);
    let route = router.find_route_between_points(
        &index,
        LatLon::new(cli.start_lat, cli.start_lon),
        LatLon::new(cli.end_lat, cli.end_lon),
        &cancellable,
    )?;

    println!("{{");
    println!("  \"type\": \"FeatureCollection\",");
    println!("  \"features\": [");
    println!("    {{");
    println!("      \"type\": \"Feature\",");
    println!("      \"properties\": {{\"weight\": {}}},", route.weight);

    println!("      \"geometry\": {{");
    println!("        \"type\": \"LineString\",");
    println!("        \"coordinates\": [");

    let mut points = route.points(router.world()).into_iter().peekable();
    while let Some(point) = points.next() {
        let suffix = if points.peek().is_some() { "," } else { "" };
        println!("          [{}, {}]{}", point.lon, point.lat, suffix);
    }

    println!("        ]");
    println!("      }}");
    println!("    }}");
    println!("  ]");
    println!("}}");

    Ok(())
}

fn load_region(
    geometry: &mut RoadGeometry,
    model: &crossroute::osm::VehicleModel<'_>,
    path: &Path,
) -> Result<(), RegionLoadError> {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .and_then(|n| n.split('.').next())
        .unwrap_or("region");

    let options = crossroute::osm::Options {
        model,
        file_format: crossroute::osm::FileFormat::Unknown,
        bbox: [0.0; 4],
    };
    match crossroute::osm::add_region_from_file(geometry, name, &options, path) {
        Ok(_) => Ok(()),
        Err(e) => Err(RegionLoadError(PathBuf::from(path), e)),
    }
}
