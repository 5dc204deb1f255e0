use algorithm::LapDetectorConfig;
use clap::{ArgGroup, Parser};
use common::position::Position;
use feed::FeedModule;
use live_session::LiveSession;
use module_core::{EventBus, EventKind, Module};
use rest::{Rest, RestConfig};
use simulator::{SimulatorConfig, SimulatorModule};
use std::{
    io::{self, Read},
    net::IpAddr,
    path::{Path, PathBuf},
    str::FromStr,
    time::Duration,
};
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(group(ArgGroup::new("source").required(true).args(["feed", "simulate"])))]
struct Cli {
    /// Address of the JSON lines telemetry feed, e.g. 192.168.4.1:9000
    #[arg(short, long)]
    feed: Option<String>,
    /// Generate telemetry instead of connecting to a feed
    #[arg(short, long)]
    simulate: bool,
    /// CSV file with a header and one "latitude,longitude" row per path point
    #[arg(short, long, requires = "simulate")]
    path_file: Option<PathBuf>,
    /// Milliseconds between two simulated records
    #[arg(long, default_value_t = 500)]
    interval_ms: u64,
    /// Seconds between two connection attempts to the feed
    #[arg(long, default_value_t = 2)]
    reconnect_secs: u64,
    /// Radius of the start/finish geofence in meters
    #[arg(short, long, default_value_t = 10.0, value_parser = parse_radius)]
    radius: f64,
    /// Laps shorter than this are not counted
    #[arg(long, default_value_t = 10)]
    min_lap_secs: u64,
    #[arg(long, default_value_t = rest::DEFAULT_PORT)]
    rest_port: u16,
    #[arg(long, default_value = "127.0.0.1")]
    rest_address: IpAddr,
}

fn parse_radius(value: &str) -> Result<f64, String> {
    match f64::from_str(value) {
        Ok(radius) if radius.is_finite() && radius > 0.0 => Ok(radius),
        Ok(radius) => Err(format!("{radius} is not a positive radius")),
        Err(e) => Err(e.to_string()),
    }
}

/// Reads path points from CSV rows of latitude and longitude.
fn read_path<R: Read>(reader: R) -> Result<Vec<Position>, io::Error> {
    let mut rdr = csv::Reader::from_reader(reader);
    let mut positions = Vec::new();
    for (row, result) in rdr.records().enumerate() {
        let record = result.map_err(io::Error::other)?;
        let field = |index: usize| {
            record
                .get(index)
                .and_then(|value| f64::from_str(value.trim()).ok())
                .ok_or_else(|| {
                    io::Error::new(
                        io::ErrorKind::InvalidData,
                        format!("Row {} has no number in column {}", row + 1, index + 1),
                    )
                })
        };
        positions.push(Position::try_new(field(0)?, field(1)?).map_err(|e| {
            io::Error::new(io::ErrorKind::InvalidData, format!("Row {}: {e}", row + 1))
        })?);
    }
    debug!("length of positions: {}", positions.len());
    Ok(positions)
}

fn read_path_from_file(file_path: &Path) -> Result<Vec<Position>, io::Error> {
    read_path(std::fs::File::open(file_path)?)
}

fn create_source(eb: &EventBus, cli: &Cli) -> Result<Box<dyn Module>, ()> {
    if let Some(address) = &cli.feed {
        let feed = FeedModule::new(eb.context(), address)
            .map_err(|e| error!("Failed to create feed for {address}. Error: {e}"))?
            .with_reconnect_delay(Duration::from_secs(cli.reconnect_secs));
        return Ok(Box::new(feed));
    }

    let path = match &cli.path_file {
        Some(file) => Some(read_path_from_file(file).map_err(|e| {
            error!("Failed to read path file {}. Error: {e}", file.display());
        })?),
        None => None,
    };
    let config = SimulatorConfig {
        interval: Duration::from_millis(cli.interval_ms),
        path,
    };
    let simulator = SimulatorModule::new(eb.context(), config)
        .map_err(|e| error!("Failed to create simulator. Error: {e}"))?;
    Ok(Box::new(simulator))
}

#[tokio::main]
async fn main() -> Result<(), ()> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let eb = EventBus::default();
    let detector_config = LapDetectorConfig {
        radius_m: cli.radius,
        min_lap_time: Duration::from_secs(cli.min_lap_secs),
    };
    let mut live_session = LiveSession::new(eb.context(), detector_config);
    let mut source = create_source(&eb, &cli)?;
    let mut rest = Rest::new(
        eb.context(),
        RestConfig {
            address: cli.rest_address,
            port: cli.rest_port,
        },
    );

    let quit_ctx = eb.context();
    ctrlc::set_handler(move || {
        info!("Quit requested, stopping modules");
        let _ = quit_ctx.publish_event(EventKind::QuitEvent);
    })
    .map_err(|e| error!("Failed to install Ctrl-C handler. Error: {e}"))?;

    info!("Starting modules...");
    let (session_result, source_result, rest_result) =
        tokio::join!(live_session.run(), source.run(), rest.run());
    session_result.and(source_result).and(rest_result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_path_rows() {
        let csv = "latitude,longitude\n52.0266,11.2825\n 52.0267 , 11.2820 \n";

        let path = read_path(csv.as_bytes()).unwrap();

        assert_eq!(
            path,
            vec![
                Position::new(&52.0266, &11.2825),
                Position::new(&52.0267, &11.2820)
            ]
        );
    }

    #[test]
    fn rejects_invalid_rows() {
        let not_a_number = "latitude,longitude\n52.0,east\n";
        let out_of_range = "latitude,longitude\n95.0,11.0\n";

        let error = read_path(not_a_number.as_bytes()).unwrap_err();
        assert_eq!(error.kind(), io::ErrorKind::InvalidData);
        let error = read_path(out_of_range.as_bytes()).unwrap_err();
        assert_eq!(error.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn requires_a_source() {
        assert!(Cli::try_parse_from(["telemetry_headless"]).is_err());
        assert!(Cli::try_parse_from(["telemetry_headless", "--feed", "a:1", "--simulate"]).is_err());
        assert!(Cli::try_parse_from(["telemetry_headless", "--path-file", "p.csv"]).is_err());

        let cli = Cli::try_parse_from(["telemetry_headless", "--simulate"]).unwrap();
        assert_eq!(cli.rest_port, 27015);
        assert_eq!(cli.radius, 10.0);
    }

    #[test]
    fn rejects_non_positive_radius() {
        for radius in ["0", "-5", "NaN", "inf"] {
            assert!(
                Cli::try_parse_from(["telemetry_headless", "--simulate", "--radius", radius])
                    .is_err()
            );
        }
        let cli =
            Cli::try_parse_from(["telemetry_headless", "--simulate", "--radius", "25.5"]).unwrap();
        assert_eq!(cli.radius, 25.5);
    }
}
