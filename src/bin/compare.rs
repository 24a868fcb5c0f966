use gaze360::config::{load_config, CompareConfig};
use gaze360::metrics::table::{append_rows, format_value};
use gaze360::metrics::Plane;
use gaze360::pipeline::compare::saliency_of;
use gaze360::pipeline::{compare_inputs, load_input, LoadedInput};
use gaze360::progress::NoProgress;
use gaze360::saliency::binary::{load_saliency_bin, save_saliency_bin};
use log::info;
use std::env;
use std::path::Path;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    if let Err(err) = run() {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let config_path = env::args().nth(1).ok_or_else(usage)?;
    let config: CompareConfig =
        load_config(Path::new(&config_path)).map_err(|e| format!("Failed to load config {config_path}: {e}"))?;

    let processor = config.pipeline.processor();
    let track = config.pipeline.track;
    let load = |path: &Path| {
        load_input(path, &processor, track, &mut NoProgress).map_err(|e| format!("Failed to load {}: {e}", path.display()))
    };
    let [path1, path2] = &config.inputs;
    let first = load(path1)?;
    let second = load(path2)?;

    let baseline = match &config.baseline {
        Some(path) => Some(Plane::from(
            &load_saliency_bin(path).map_err(|e| format!("Failed to load baseline {}: {e}", path.display()))?,
        )),
        None => None,
    };

    let rows = compare_inputs(&first, &second, baseline.as_ref(), &config, &mut NoProgress)
        .map_err(|e| format!("Comparison failed: {e}"))?;
    for row in &rows {
        println!("{},{},{},{}", row.name1, row.name2, row.metric, format_value(row.value));
    }

    let table = config.output_dir.join(&config.table);
    append_rows(&table, &rows).map_err(|e| format!("Failed to write {}: {e}", table.display()))?;
    info!("{} rows appended to {}", rows.len(), table.display());

    if config.keep_maps && config.saliency {
        for input in [&first, &second] {
            keep_map(input, &config)?;
        }
    }
    Ok(())
}

fn keep_map(input: &LoadedInput, config: &CompareConfig) -> Result<(), String> {
    if input.saliency.is_some() || !input.has_points() {
        return Ok(());
    }
    let map = saliency_of(input, config, &mut NoProgress).map_err(|e| e.to_string())?;
    let path = save_saliency_bin(&map, &config.output_dir, &input.name, config.pipeline.precision)
        .map_err(|e| format!("Failed to save saliency of {}: {e}", input.name))?;
    info!("saliency map kept at {}", path.display());
    Ok(())
}

fn usage() -> String {
    "Usage: compare <config.json>".to_string()
}
