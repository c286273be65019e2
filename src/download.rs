// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Pose model downloading.
//!
//! Known Ultralytics pose exports are fetched from GitHub releases when the
//! configured model file is missing.

use std::fs::{self, File};
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::error::{MeasureError, Result};

/// Default YOLO pose model name.
pub const DEFAULT_POSE_MODEL: &str = "yolo11n-pose.onnx";

/// Release URL for each downloadable model file name.
const KNOWN_MODELS: &[(&str, &str)] = &[(
    DEFAULT_POSE_MODEL,
    "https://github.com/ultralytics/assets/releases/download/v8.3.0/yolo11n-pose.onnx",
)];

/// Connection timeout in seconds.
const CONNECT_TIMEOUT: u64 = 30;

/// Read timeout in seconds.
const READ_TIMEOUT: u64 = 300;

/// Progress is logged every this many percent.
const PROGRESS_STEP: u64 = 25;

/// Format bytes as human-readable string (e.g., "10.4MB").
#[allow(clippy::cast_precision_loss)]
fn format_bytes(bytes: u64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;

    let bytes = bytes as f64;
    if bytes >= MB {
        format!("{:.1}MB", bytes / MB)
    } else if bytes >= KB {
        format!("{:.1}KB", bytes / KB)
    } else {
        format!("{bytes:.0}B")
    }
}

/// Look up the release URL for a model file name.
#[must_use]
pub fn model_url(filename: &str) -> Option<&'static str> {
    KNOWN_MODELS
        .iter()
        .find(|(name, _)| *name == filename)
        .map(|(_, url)| *url)
}

/// Stream `url` into `dest` through a `.part` file that is renamed on success.
fn download_file(url: &str, dest: &Path) -> Result<()> {
    let config = ureq::Agent::config_builder()
        .timeout_connect(Some(Duration::from_secs(CONNECT_TIMEOUT)))
        .timeout_recv_body(Some(Duration::from_secs(READ_TIMEOUT)))
        .build();
    let agent = ureq::Agent::new_with_config(config);

    let response = agent.get(url).call().map_err(|e| {
        let msg = match &e {
            ureq::Error::Timeout(_) => format!("Connection timed out while downloading {url}"),
            ureq::Error::Io(io_err) => format!("Network error downloading {url}: {io_err}"),
            _ => format!("Failed to download {url}: {e}"),
        };
        MeasureError::ModelLoadError(msg)
    })?;

    let total_size: u64 = response
        .headers()
        .get("content-length")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.parse().ok())
        .unwrap_or(0);

    let temp_path = dest.with_extension("part");
    let _ = fs::remove_file(&temp_path);

    tracing::info!(%url, dest = %dest.display(), size = %format_bytes(total_size), "Downloading model");
    let start = Instant::now();

    let copied = (|| -> Result<u64> {
        let mut writer = BufWriter::new(File::create(&temp_path)?);
        let mut reader = response.into_body().into_reader();
        let mut buffer = [0u8; 65536];
        let mut downloaded: u64 = 0;
        let mut next_report = PROGRESS_STEP;

        loop {
            let n = reader.read(&mut buffer).map_err(|e| {
                MeasureError::ModelLoadError(format!("Failed to read from network: {e}"))
            })?;
            if n == 0 {
                break;
            }
            writer.write_all(&buffer[..n])?;
            downloaded += n as u64;

            if total_size > 0 && downloaded * 100 / total_size >= next_report {
                tracing::info!(
                    percent = downloaded * 100 / total_size,
                    downloaded = %format_bytes(downloaded),
                    "Download progress"
                );
                next_report += PROGRESS_STEP;
            }
        }

        writer.flush()?;
        Ok(downloaded)
    })();

    let downloaded = match copied {
        Ok(n) => n,
        Err(e) => {
            let _ = fs::remove_file(&temp_path);
            return Err(e);
        }
    };

    fs::rename(&temp_path, dest).map_err(|e| {
        let _ = fs::remove_file(&temp_path);
        MeasureError::ModelLoadError(format!(
            "Failed to move downloaded file to {}: {e}",
            dest.display()
        ))
    })?;

    tracing::info!(
        size = %format_bytes(downloaded),
        elapsed_s = start.elapsed().as_secs_f64(),
        "Model downloaded"
    );
    Ok(())
}

/// Download a model if its file name is a known Ultralytics pose export.
///
/// The file is written next to `model_path` (creating the directory if
/// needed).
///
/// # Errors
///
/// Returns [`MeasureError::ModelLoadError`] if the name is unknown or the
/// download fails.
pub fn try_download_model<P: AsRef<Path>>(model_path: P) -> Result<PathBuf> {
    let path = model_path.as_ref();
    let filename = path.file_name().and_then(|n| n.to_str()).unwrap_or("");

    let url = model_url(filename).ok_or_else(|| {
        MeasureError::ModelLoadError(format!(
            "Model file not found: {} (auto-download is available for: {})",
            path.display(),
            KNOWN_MODELS.iter().map(|(name, _)| *name).collect::<Vec<_>>().join(", ")
        ))
    })?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    download_file(url, path)?;
    Ok(path.to_path_buf())
}

/// Return `model_path` if it exists, otherwise try to download it.
///
/// # Errors
///
/// Returns an error if the file is missing and cannot be downloaded.
pub fn ensure_model<P: AsRef<Path>>(model_path: P) -> Result<PathBuf> {
    let path = model_path.as_ref();
    if path.exists() {
        return Ok(path.to_path_buf());
    }
    tracing::warn!(model = %path.display(), "Model not found locally");
    try_download_model(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512B");
        assert_eq!(format_bytes(2048), "2.0KB");
        assert_eq!(format_bytes(10 * 1024 * 1024 + 400 * 1024), "10.4MB");
    }

    #[test]
    fn test_model_url() {
        assert!(model_url(DEFAULT_POSE_MODEL).is_some_and(|u| u.ends_with("yolo11n-pose.onnx")));
        assert!(model_url("yolo11n.onnx").is_none());
    }

    #[test]
    fn test_unknown_model_not_downloaded() {
        let err = try_download_model("models/custom-pose.onnx").unwrap_err();
        assert!(matches!(err, MeasureError::ModelLoadError(_)));
    }

    #[test]
    fn test_ensure_model_existing_file() {
        let dir = std::env::temp_dir().join(format!("pose-measure-dl-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("local-pose.onnx");
        fs::write(&path, b"onnx").unwrap();

        assert_eq!(ensure_model(&path).unwrap(), path);
        fs::remove_dir_all(&dir).unwrap();
    }
}
