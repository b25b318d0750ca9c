//! Loading a [`DetectionConfig`] from a JSON file.
//!
//! The file holds a (possibly partial) serialized [`DetectionConfig`];
//! missing fields take their defaults.

use std::path::Path;

use boxmeasure_pipeline::DetectionConfig;

use crate::MeasureError;

/// Read, parse, and validate a JSON config file.
///
/// # Errors
///
/// Returns [`MeasureError::ConfigRead`] if the file cannot be read,
/// [`MeasureError::ConfigParse`] if it is not valid config JSON, and
/// [`MeasureError::InvalidConfig`] if the parsed config fails
/// [`DetectionConfig::validate`].
pub fn load_config(path: &Path) -> Result<DetectionConfig, MeasureError> {
    let text = std::fs::read_to_string(path).map_err(|source| MeasureError::ConfigRead {
        path: path.to_path_buf(),
        source,
    })?;
    let config: DetectionConfig =
        serde_json::from_str(&text).map_err(|source| MeasureError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })?;
    config
        .validate()
        .map_err(|e| MeasureError::from_detection(path, e))?;
    tracing::debug!(path = %path.display(), "loaded detection config");
    Ok(config)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use boxmeasure_pipeline::OverlapPolicy;

    use super::*;

    fn write_config(text: &str) -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, text).unwrap();
        (dir, path)
    }

    #[test]
    fn partial_config_fills_defaults() {
        let (_dir, path) = write_config(r#"{"overlap": "suppress", "canny_low": 30.0}"#);
        let config = load_config(&path).unwrap();
        assert_eq!(config.overlap, OverlapPolicy::Suppress);
        assert!((config.canny_low - 30.0).abs() < f32::EPSILON);
        assert_eq!(config.blur_kernel_size, DetectionConfig::DEFAULT_BLUR_KERNEL_SIZE);
    }

    #[test]
    fn preset_round_trips_through_file() {
        let preset = DetectionConfig::dilated();
        let (_dir, path) = write_config(&serde_json::to_string_pretty(&preset).unwrap());
        assert_eq!(load_config(&path).unwrap(), preset);
    }

    #[test]
    fn missing_file_is_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_config(&dir.path().join("nope.json")).unwrap_err();
        assert!(matches!(err, MeasureError::ConfigRead { .. }));
    }

    #[test]
    fn malformed_json_is_parse_error() {
        let (_dir, path) = write_config("{ not json");
        assert!(matches!(
            load_config(&path).unwrap_err(),
            MeasureError::ConfigParse { .. }
        ));
    }

    #[test]
    fn unknown_policy_is_parse_error() {
        let (_dir, path) = write_config(r#"{"overlap": "merge"}"#);
        assert!(matches!(
            load_config(&path).unwrap_err(),
            MeasureError::ConfigParse { .. }
        ));
    }

    #[test]
    fn even_kernel_is_invalid_config() {
        let (_dir, path) = write_config(r#"{"blur_kernel_size": 8}"#);
        assert!(matches!(
            load_config(&path).unwrap_err(),
            MeasureError::InvalidConfig(_)
        ));
    }
}
