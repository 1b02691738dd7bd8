use std::env;
use std::fs::{create_dir_all, File};
use std::io;
use std::path::Path;
use std::process;

use log::{error, info};
use structured_logger::json::new_writer;
use structured_logger::Builder;

use event_map::config::MapConfig;
use event_map::session::{MapSession, Selection};

fn setup_logging() {
    Builder::with_level("info")
        .with_target_writer("*", new_writer(io::stdout()))
        .init();
}

fn load_config(path: &str) -> MapConfig {
    let file = File::open(path).expect("Could not open config file.");
    serde_json::from_reader(file).expect("Could not parse config.")
}

#[tokio::main]
async fn main() -> io::Result<()> {
    setup_logging();

    let args: Vec<String> = env::args().collect();
    let config_path = args
        .get(1)
        .map(String::as_str)
        .unwrap_or("config/event-map.json");
    let selection = Selection {
        language: args.get(2).and_then(|v| v.parse().ok()).unwrap_or_default(),
        distance: args.get(3).and_then(|v| v.parse().ok()).unwrap_or_default(),
    };

    let config = load_config(config_path);
    let mut session = MapSession::new(config);
    session.refresh(selection).await;

    let map = match session.current() {
        Some(map) => map,
        None => {
            if let Some(err) = session.last_error() {
                error!(error = err.to_string(); "could not load event map");
            }
            process::exit(1);
        }
    };

    let output_dir = Path::new("output");
    create_dir_all(output_dir)?;
    let output_path = output_dir.join(format!(
        "{}-{}.geojson",
        selection.language, selection.distance
    ));
    let file = File::create(&output_path)?;
    serde_json::to_writer_pretty(file, &map.to_geojson())?;

    info!(
        path = output_path.display().to_string(),
        features = map.features.len();
        "wrote event map"
    );
    if let Some(center) = map.bounds.center() {
        info!(lat = center[0], lng = center[1]; "viewport center");
    }

    Ok(())
}
