// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

#![allow(clippy::multiple_crate_versions)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! # Pose Measure
//!
//! Approximate body measurements from a single full-body photo. A YOLO pose
//! model running on [ONNX Runtime](https://onnxruntime.ai) finds the 17 COCO
//! body keypoints, and the user's stated height calibrates pixels to
//! centimeters.
//!
//! ## Features
//!
//! - **Pose Detection** - Ultralytics YOLO pose exports through `ort`, with letterboxing and NMS
//! - **Measurement Calculator** - Pure, deterministic geometry on keypoints
//! - **HTTP API** - `axum` server with CORS, upload limits, timeouts, and Swagger UI
//! - **CLI** - `serve` the API or `measure` a single image
//!
//! ## Quick Start (Library)
//!
//! ```no_run
//! use pose_measure::{CalibrationConfig, PersonSelection, PoseModel, measure_person};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut model = PoseModel::load("yolo11n-pose.onnx")?;
//!     let image = image::open("person.jpg")?;
//!
//!     let m = measure_person(
//!         &mut model,
//!         &image,
//!         175.0,
//!         PersonSelection::HighestConfidence,
//!         &CalibrationConfig::default(),
//!     )?;
//!     println!("Shoulders: {} cm, legs: {} cm", m.shoulder_width, m.leg_length);
//!     Ok(())
//! }
//! ```
//!
//! The calculator works on any keypoint source:
//!
//! ```rust
//! use pose_measure::{BodyPart, CalibrationConfig, KeypointSet, compute};
//!
//! let mut coords = vec![(120.0, 20.0); 17];
//! coords[BodyPart::LeftShoulder.index()] = (100.0, 50.0);
//! coords[BodyPart::RightShoulder.index()] = (140.0, 50.0);
//! coords[BodyPart::LeftAnkle.index()] = (100.0, 250.0);
//! coords[BodyPart::RightAnkle.index()] = (140.0, 250.0);
//!
//! let m = compute(&KeypointSet::from_xy(&coords), 180.0, &CalibrationConfig::default())?;
//! assert!((m.shoulder_width - 28.8).abs() < 1e-9);
//! # Ok::<(), pose_measure::MeasureError>(())
//! ```
//!
//! ## CLI Usage
//!
//! ```bash
//! # Serve the API on port 8000 (auto-downloads yolo11n-pose.onnx)
//! pose-measure serve
//!
//! # Measure one photo
//! pose-measure measure --source photo.jpg --height 175
//! ```
//!
//! ## HTTP API
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/analyze-pose` | Multipart `image` + `height` → measurements |
//! | `GET` | `/health` | Liveness check |
//! | `GET` | `/info` | Model and calculator settings |
//! | `GET` | `/swagger-ui/` | Interactive API documentation |
//!
//! ## Module Overview
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`measurement`] | [`compute`], [`CalibrationConfig`], [`Measurements`] |
//! | [`keypoints`] | [`BodyPart`], [`Keypoint`], [`KeypointSet`] |
//! | [`detector`] | [`KeypointProvider`] trait and [`PersonSelection`] |
//! | [`model`] | [`PoseModel`] on ONNX Runtime |
//! | [`server`] | `axum` router and handlers |
//! | [`error`] | Error types ([`MeasureError`], [`Result`]) |
//!
//! ## Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `cuda` | NVIDIA CUDA acceleration |
//! | `coreml` | Apple `CoreML` (macOS/iOS) |

// Modules
pub mod cli;
pub mod config;
pub mod detector;
pub mod download;
pub mod error;
pub mod inference;
pub mod keypoints;
pub mod measurement;
pub mod metadata;
pub mod model;
pub mod postprocessing;
pub mod preprocessing;
pub mod server;
pub mod utils;

// Re-export main types for convenience
pub use config::ServerConfig;
pub use detector::{KeypointProvider, PersonSelection, detect_person, measure_person, select_person};
pub use error::{MeasureError, Result};
pub use inference::DetectorConfig;
pub use keypoints::{BodyPart, Keypoint, KeypointSet, NUM_KEYPOINTS};
pub use measurement::{CalibrationConfig, Measurements, compute, parse_height, pixel_to_cm_ratio};
pub use metadata::ModelMetadata;
pub use model::PoseModel;
pub use postprocessing::PoseDetection;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name.
pub const NAME: &str = env!("CARGO_PKG_NAME");
