// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Registry loading.
//!
//! An absent or invalid `api_config.json` is not fatal: the registry
//! substitutes the one-item default and the system continues with a
//! warning.

use std::path::Path;

use tracing::{info, warn};

use oconn_core::error::{ConfigError, ConfigResult};
use oconn_core::registry::DescriptorRegistry;

use crate::schema::ApiConfigFile;

/// Loads the registry, substituting the default on any failure.
pub fn load_registry(path: &Path) -> DescriptorRegistry {
    match try_load_registry(path) {
        Ok(registry) => {
            info!(
                path = %path.display(),
                descriptors = registry.len(),
                "API configuration loaded"
            );
            registry
        }
        Err(e) => {
            warn!(
                path = %path.display(),
                error = %e,
                "API configuration unusable, substituting the default descriptor"
            );
            DescriptorRegistry::fallback()
        }
    }
}

/// Loads the registry, surfacing failures. Used by `validate`.
pub fn try_load_registry(path: &Path) -> ConfigResult<DescriptorRegistry> {
    let content =
        std::fs::read_to_string(path).map_err(|e| ConfigError::io(path, e))?;
    let file: ApiConfigFile = serde_json::from_str(&content)
        .map_err(|e| ConfigError::parse(path, e.to_string()))?;
    Ok(file.build_registry())
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_falls_back() {
        let registry = load_registry(Path::new("/nonexistent/api_config.json"));
        assert_eq!(registry.len(), 1);
        assert!(registry.resolve("WorkCounterA_Counted").is_some());
    }

    #[test]
    fn test_invalid_json_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("api_config.json");
        std::fs::write(&path, "{ not json").unwrap();

        let registry = load_registry(&path);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_valid_file_loads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("api_config.json");
        std::fs::write(
            &path,
            r#"{"Configurations":{"lathe":{"LB3000":{"General":[
                {"ApiName":"SpindleSpeed","SubsystemIndex":1,"MajorIndex":140,
                 "MinorIndex":0,"StyleCode":8,"Subscript":0,
                 "DataFieldName":"SpindleSpeed_S1","DataType":"double"}
            ]}}}}"#,
        )
        .unwrap();

        let registry = load_registry(&path);
        assert_eq!(registry.len(), 1);
        assert!(registry.resolve("SpindleSpeed_S1").is_some());
    }

    #[test]
    fn test_try_load_surfaces_errors() {
        assert!(try_load_registry(Path::new("/nonexistent/x.json")).is_err());
    }
}
