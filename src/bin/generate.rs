use gaze360::config::{load_config, GenerateConfig};
use gaze360::features::layout::load_fixation_list;
use gaze360::features::write_fixation_csv;
use gaze360::image::io::{save_saliency_png, write_json_file};
use gaze360::image::ImageF32;
use gaze360::pipeline::{detect_input, process_batch, InputKind};
use gaze360::progress::NoProgress;
use gaze360::saliency::binary::{save_fixation_map_bin, save_saliency_bin, save_video_bin};
use gaze360::saliency::video::build_saliency_video;
use gaze360::saliency::{build_saliency, FixationMap};
use gaze360::types::{FixationPoint, FixationRecord};
use gaze360::ProcessReport;
use log::{info, warn};
use std::env;
use std::path::{Path, PathBuf};

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    if let Err(err) = run() {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}

/// One viewer's data ready for export.
struct Subject {
    name: String,
    points: Vec<FixationPoint>,
    records: Vec<FixationRecord>,
    report: Option<ProcessReport>,
}

fn run() -> Result<(), String> {
    let config_path = env::args().nth(1).ok_or_else(usage)?;
    let config: GenerateConfig =
        load_config(Path::new(&config_path)).map_err(|e| format!("Failed to load config {config_path}: {e}"))?;
    std::fs::create_dir_all(&config.output_dir)
        .map_err(|e| format!("Failed to create output dir {}: {e}", config.output_dir.display()))?;

    let mut raw_paths: Vec<PathBuf> = Vec::new();
    let mut subjects: Vec<Subject> = Vec::new();
    let mut failures = 0usize;
    for path in &config.inputs {
        match detect_input(path) {
            Ok(InputKind::Recording) => raw_paths.push(path.clone()),
            Ok(InputKind::FixationList) => match load_fixation_list(path) {
                Ok(points) => subjects.push(Subject {
                    name: file_stem(path),
                    points,
                    records: Vec::new(),
                    report: None,
                }),
                Err(e) => {
                    warn!("skipping {}: {e}", path.display());
                    failures += 1;
                }
            },
            Ok(kind) => {
                warn!("skipping {}: {kind:?} inputs carry no fixations", path.display());
                failures += 1;
            }
            Err(e) => {
                warn!("skipping {}: {e}", path.display());
                failures += 1;
            }
        }
    }

    let processor = config.pipeline.processor();
    let track = config.pipeline.track;
    for (path, result) in process_batch(&raw_paths, &processor) {
        let Ok(out) = result else {
            failures += 1;
            continue;
        };
        let (name, points) = if config.outputs.raw_samples {
            (format!("{}_raw", file_stem(&path)), out.sample_points(track))
        } else {
            (file_stem(&path), out.fixation_points(track))
        };
        let records = if config.outputs.raw_samples {
            Vec::new()
        } else {
            out.features.records.clone()
        };
        subjects.push(Subject {
            name,
            points,
            records,
            report: Some(out.report),
        });
    }

    for subject in &subjects {
        export(subject, &config).map_err(|e| format!("Failed to export {}: {e}", subject.name))?;
    }
    info!("generated data for {} of {} inputs", subjects.len(), config.inputs.len());
    if subjects.is_empty() && failures > 0 {
        return Err(format!("all {failures} inputs failed"));
    }
    Ok(())
}

fn export(subject: &Subject, config: &GenerateConfig) -> gaze360::Result<()> {
    let dir = &config.output_dir;
    let outputs = &config.outputs;
    let pipeline = &config.pipeline;
    let saliency = &pipeline.saliency;

    if outputs.fixations_csv && !subject.records.is_empty() {
        let path = dir.join(format!("{}_fixation.csv", subject.name));
        write_fixation_csv(&path, &subject.records, &config.fixations)?;
        info!("fixation list written to {}", path.display());
    }

    if outputs.saliency_bin || outputs.saliency_png {
        let map = match &pipeline.video {
            Some(timing) => {
                let video = build_saliency_video(&subject.points, saliency, timing, &mut NoProgress)?;
                if outputs.saliency_bin {
                    let path = save_video_bin(&video, dir, &subject.name, pipeline.precision)?;
                    info!("saliency video written to {}", path.display());
                }
                video.pooled(0..video.frame_count())
            }
            None => {
                let map = build_saliency(&subject.points, saliency, &mut NoProgress)?;
                if outputs.saliency_bin {
                    let path = save_saliency_bin(&map, dir, &subject.name, pipeline.precision)?;
                    info!("saliency map written to {}", path.display());
                }
                map
            }
        };
        if outputs.saliency_png {
            save_saliency_png(&map, &dir.join(format!("{}_salmap.png", subject.name)))?;
        }
    }

    if outputs.fixation_map_bin || outputs.fixation_map_png {
        let fixations = FixationMap::from_points(&subject.points, saliency.width, saliency.height);
        if outputs.fixation_map_bin {
            let path = save_fixation_map_bin(&fixations, dir, &subject.name, pipeline.precision)?;
            info!("fixation map written to {}", path.display());
        }
        if outputs.fixation_map_png {
            let counts: Vec<f32> = fixations.data.iter().map(|&c| c as f32).collect();
            if let Some(image) = ImageF32::from_vec(fixations.w, fixations.h, counts) {
                save_saliency_png(&image, &dir.join(format!("{}_fixmap.png", subject.name)))?;
            }
        }
    }

    if let (true, Some(report)) = (outputs.report_json, &subject.report) {
        write_json_file(&dir.join(format!("{}_report.json", subject.name)), report)?;
    }
    Ok(())
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn usage() -> String {
    "Usage: generate <config.json>".to_string()
}
