// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! `measure` command.

use crate::cli::args::MeasureArgs;
use crate::detector::measure_person;
use crate::download::ensure_model;
use crate::error::{MeasureError, Result};
use crate::model::PoseModel;
use crate::server::{AnalysisResponse, decode_image};
use crate::{section, success};

/// Measure the person in one image and print the response JSON to stdout.
///
/// # Errors
///
/// Returns an error if the model or image cannot be loaded, or the person
/// cannot be measured.
pub fn run(args: &MeasureArgs) -> Result<()> {
    let calibration = args.model.calibration();
    calibration.validate()?;

    section!("Loading model");
    let model_path = ensure_model(&args.model.model)?;
    let mut model = PoseModel::load_with_config(&model_path, args.model.detector_config())?;

    section!("Measuring {}", args.source.display());
    let image = decode_image(&args.source)?;
    let measurements = measure_person(&mut model, &image, args.height, args.model.person, &calibration)?;

    let json = serde_json::to_string_pretty(&AnalysisResponse::new(measurements))
        .map_err(|e| MeasureError::Internal(format!("Failed to serialize result: {e}")))?;
    println!("{json}");

    success!("Measured {} at {} cm", args.source.display(), args.height);
    Ok(())
}
