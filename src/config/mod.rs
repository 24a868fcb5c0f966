//! JSON run configuration of the binaries.
//!
//! Every section is optional and falls back to the library defaults, so
//! `{"inputs": ["a.csv"], "output_dir": "out"}` is a complete generate
//! configuration.
use crate::error::Result;
use crate::features::FixationCsvOptions;
use crate::metrics::dynamic::DynamicOptions;
use crate::metrics::MetricOptions;
use crate::pipeline::GazeProcessor;
use crate::preprocess::PreprocessOptions;
use crate::saliency::binary::FloatWidth;
use crate::saliency::video::FrameTiming;
use crate::saliency::SaliencyOptions;
use crate::scanpath::dynamic::ScanpathWindowOptions;
use crate::scanpath::MultiMatchWeights;
use crate::segment::SegmenterConfig;
use crate::types::Track;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Parameters shared by every stage from raw samples to saliency maps.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub preprocess: PreprocessOptions,
    pub segmenter: SegmenterConfig,
    /// Track whose fixation positions feed maps and scanpaths.
    pub track: Track,
    pub saliency: SaliencyOptions,
    /// Frame layout of a video stimulus; `None` for static images.
    pub video: Option<FrameTiming>,
    pub precision: FloatWidth,
}

impl PipelineConfig {
    pub fn processor(&self) -> GazeProcessor {
        GazeProcessor::new(self.preprocess.clone(), self.segmenter.clone())
    }
}

/// Artefacts written per input by `generate`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerateOutputs {
    pub fixations_csv: bool,
    pub saliency_bin: bool,
    pub saliency_png: bool,
    pub fixation_map_bin: bool,
    pub fixation_map_png: bool,
    pub report_json: bool,
    /// Treat every retained raw sample as a fixation.
    pub raw_samples: bool,
}

impl Default for GenerateOutputs {
    fn default() -> Self {
        Self {
            fixations_csv: true,
            saliency_bin: true,
            saliency_png: false,
            fixation_map_bin: true,
            fixation_map_png: false,
            report_json: true,
            raw_samples: false,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GenerateConfig {
    pub inputs: Vec<PathBuf>,
    pub output_dir: PathBuf,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub fixations: FixationCsvOptions,
    #[serde(default)]
    pub outputs: GenerateOutputs,
}

fn default_table() -> String {
    "comparisons.csv".to_string()
}

fn default_compare_weights() -> MultiMatchWeights {
    MultiMatchWeights::from_array([1.0, 0.0, 1.0, 1.0, 1.0])
}

fn enabled() -> bool {
    true
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CompareConfig {
    pub inputs: [PathBuf; 2],
    pub output_dir: PathBuf,
    /// File name of the appended comparison table inside `output_dir`.
    #[serde(default = "default_table")]
    pub table: String,
    /// Reference map enabling InfoGain.
    #[serde(default)]
    pub baseline: Option<PathBuf>,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default = "enabled")]
    pub saliency: bool,
    #[serde(default = "enabled")]
    pub scanpath: bool,
    #[serde(default)]
    pub metrics: MetricOptions,
    /// Duration is left out by default.
    #[serde(default = "default_compare_weights")]
    pub weights: MultiMatchWeights,
    #[serde(default)]
    pub dynamic: DynamicOptions,
    #[serde(default)]
    pub scanpath_window: ScanpathWindowOptions,
    /// Keep the synthesized saliency maps next to the table.
    #[serde(default)]
    pub keep_maps: bool,
}

/// Reads a JSON configuration file.
pub fn load_config<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let data = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&data)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preprocess::TrackingMode;

    #[test]
    fn minimal_generate_config_uses_defaults() {
        let cfg: GenerateConfig = serde_json::from_str(r#"{"inputs": ["a.csv"], "output_dir": "out"}"#).unwrap();
        assert_eq!(cfg.pipeline, PipelineConfig::default());
        assert_eq!(cfg.pipeline.saliency.width, 2000);
        assert_eq!(cfg.pipeline.segmenter.name, "I-VT");
        assert!(cfg.outputs.fixations_csv && !cfg.outputs.saliency_png);
    }

    #[test]
    fn nested_sections_override_single_fields() {
        let json = r#"{
            "inputs": ["a.csv", "b.csv"],
            "output_dir": "out",
            "pipeline": {
                "preprocess": {"tracking": "H", "resample_hz": 120.0},
                "segmenter": {"name": "I-HMM"},
                "track": "head",
                "saliency": {"sigma_deg": 3.5},
                "precision": "16"
            },
            "weights": {"duration": 1.0}
        }"#;
        let cfg: CompareConfig = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.pipeline.preprocess.tracking, TrackingMode::Head);
        assert_eq!(cfg.pipeline.preprocess.outlier_sigma, Some(5.0));
        assert_eq!(cfg.pipeline.track, Track::Head);
        assert_eq!(cfg.pipeline.saliency.sigma_deg, 3.5);
        assert_eq!(cfg.pipeline.saliency.height, 1000);
        assert_eq!(cfg.pipeline.precision, FloatWidth::F16);
        assert_eq!(cfg.weights.as_array(), [1.0; 5]);
        assert_eq!(cfg.table, "comparisons.csv");
        assert!(cfg.saliency && cfg.scanpath && !cfg.keep_maps);
    }

    #[test]
    fn compare_weights_skip_duration_by_default() {
        let cfg: CompareConfig = serde_json::from_str(r#"{"inputs": ["a", "b"], "output_dir": "o"}"#).unwrap();
        assert_eq!(cfg.weights.as_array(), [1.0, 0.0, 1.0, 1.0, 1.0]);
    }

    #[test]
    fn load_config_reads_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cfg.json");
        fs::write(&path, r#"{"inputs": [], "output_dir": "o", "outputs": {"saliency_png": true}}"#).unwrap();
        let cfg: GenerateConfig = load_config(&path).unwrap();
        assert!(cfg.outputs.saliency_png && cfg.outputs.saliency_bin);
        assert!(load_config::<GenerateConfig>(&dir.path().join("missing.json")).is_err());
    }
}
