// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};

use crate::config::{
    DEFAULT_ALLOWED_ORIGIN, DEFAULT_HOST, DEFAULT_MAX_UPLOAD_BYTES, DEFAULT_PORT, DEFAULT_UPLOAD_DIR,
    ServerConfig,
};
use crate::detector::PersonSelection;
use crate::download::DEFAULT_POSE_MODEL;
use crate::inference::DetectorConfig;
use crate::measurement::{CalibrationConfig, parse_height};

/// CLI arguments parser.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
#[command(after_help = r#"Examples:
    pose-measure serve
    pose-measure serve --port 9000 --allowed-origin https://shop.example.com
    pose-measure serve --model models/yolo11s-pose.onnx --person largest-box
    pose-measure measure --source photo.jpg --height 175"#)]
pub struct Cli {
    #[command(subcommand)]
    /// Subcommand to execute.
    pub command: Commands,

    /// Show debug logs
    #[arg(long, global = true, default_value_t = false)]
    pub verbose: bool,
}

/// Commands for the CLI.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the HTTP measurement API
    Serve(ServeArgs),
    /// Measure the person in one image and print the result as JSON
    Measure(MeasureArgs),
}

/// Model and calculator options shared by every command.
#[derive(Args, Debug, Clone)]
pub struct ModelArgs {
    /// Path to ONNX pose model file
    #[arg(short, long, env = "MODEL_PATH", default_value = DEFAULT_POSE_MODEL)]
    pub model: PathBuf,

    /// Confidence threshold
    #[arg(long, default_value_t = 0.25)]
    pub conf: f32,

    /// `IoU` threshold for NMS
    #[arg(long, default_value_t = 0.45)]
    pub iou: f32,

    /// Inference image size (square)
    #[arg(long)]
    pub imgsz: Option<usize>,

    /// ONNX Runtime intra-op threads (0 = automatic)
    #[arg(long, default_value_t = 0)]
    pub threads: usize,

    /// Person to measure when several are detected
    #[arg(long, value_enum, default_value_t = PersonSelection::HighestConfidence)]
    pub person: PersonSelection,

    /// Share of the user's height spanned by shoulders to ankles
    #[arg(long, default_value_t = 0.80)]
    pub body_height_ratio: f64,

    /// Correction applied to the chest circumference estimate
    #[arg(long, default_value_t = 0.9)]
    pub chest_correction: f64,
}

impl ModelArgs {
    /// Detector settings from the command line.
    #[must_use]
    pub fn detector_config(&self) -> DetectorConfig {
        let config = DetectorConfig::new()
            .with_confidence(self.conf)
            .with_iou(self.iou)
            .with_threads(self.threads);
        match self.imgsz {
            Some(size) => config.with_imgsz(size, size),
            None => config,
        }
    }

    /// Calibration settings from the command line.
    #[must_use]
    pub fn calibration(&self) -> CalibrationConfig {
        CalibrationConfig::new()
            .with_body_height_ratio(self.body_height_ratio)
            .with_chest_correction(self.chest_correction)
    }
}

/// Arguments for the serve command.
#[derive(Args, Debug)]
pub struct ServeArgs {
    #[command(flatten)]
    pub model: ModelArgs,

    /// Host to bind
    #[arg(long, env = "HOST", default_value = DEFAULT_HOST)]
    pub host: String,

    /// Port to bind
    #[arg(short, long, env = "PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Front-end origin allowed by CORS
    #[arg(long, env = "FRONTEND_URL", default_value = DEFAULT_ALLOWED_ORIGIN)]
    pub allowed_origin: String,

    /// Directory for transient uploads
    #[arg(long, env = "UPLOAD_DIR", default_value = DEFAULT_UPLOAD_DIR)]
    pub upload_dir: PathBuf,

    /// Maximum upload size in MiB
    #[arg(long, default_value_t = DEFAULT_MAX_UPLOAD_BYTES / (1024 * 1024))]
    pub max_upload_mb: usize,

    /// Pose detection timeout in seconds
    #[arg(long, default_value_t = 30)]
    pub timeout_secs: u64,

    /// Maximum pose detections running at once
    #[arg(long, default_value_t = 2)]
    pub max_concurrent: usize,
}

impl ServeArgs {
    /// Server settings from the command line.
    #[must_use]
    pub fn server_config(&self) -> ServerConfig {
        ServerConfig {
            host: self.host.clone(),
            port: self.port,
            allowed_origin: self.allowed_origin.clone(),
            upload_dir: self.upload_dir.clone(),
            max_upload_bytes: self.max_upload_mb.saturating_mul(1024 * 1024),
            detection_timeout: Duration::from_secs(self.timeout_secs),
            max_concurrent_detections: self.max_concurrent,
            person_selection: self.model.person,
            calibration: self.model.calibration(),
        }
    }
}

/// Arguments for the measure command.
#[derive(Args, Debug)]
pub struct MeasureArgs {
    #[command(flatten)]
    pub model: ModelArgs,

    /// Image of the person to measure
    #[arg(short, long)]
    pub source: PathBuf,

    /// User height in centimeters
    #[arg(long, value_parser = parse_height)]
    pub height: f64,
}
