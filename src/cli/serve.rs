// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! `serve` command.

use crate::cli::args::ServeArgs;
use crate::download::ensure_model;
use crate::error::Result;
use crate::model::PoseModel;
use crate::server::{self, AppState, ModelInfo};
use crate::section;

/// Load the pose model and run the HTTP API until shutdown.
///
/// # Errors
///
/// Returns an error if the configuration is invalid, the model cannot be
/// loaded, or the server fails.
pub fn run(args: &ServeArgs) -> Result<()> {
    let config = args.server_config();
    config.validate()?;

    section!("Loading model");
    let model_path = ensure_model(&args.model.model)?;
    let mut model = PoseModel::load_with_config(&model_path, args.model.detector_config())?;
    model.warmup()?;

    let info = ModelInfo::from_model(&model);
    tracing::info!(
        model = %info.description,
        person = %config.person_selection,
        max_concurrent = config.max_concurrent_detections,
        timeout_s = config.detection_timeout.as_secs_f64(),
        "Model ready"
    );

    let state = AppState::new(Box::new(model), info, config);
    let runtime = tokio::runtime::Builder::new_multi_thread().enable_all().build()?;
    runtime.block_on(server::serve(state))
}
