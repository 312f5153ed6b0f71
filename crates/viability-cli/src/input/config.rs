use std::path::Path;

use viability_core::EngineConfig;

use super::file;

/// Engine configuration from a JSON or YAML file, or the built-in defaults.
pub fn load_config(path: Option<&str>) -> Result<EngineConfig, Box<dyn std::error::Error>> {
    let Some(path) = path else {
        return Ok(EngineConfig::default());
    };

    let (canonical, contents) = file::read_text(path)?;
    let extension = Path::new(&canonical)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    let config: EngineConfig = match extension.as_deref() {
        Some("yaml") | Some("yml") => serde_yaml::from_str(&contents)
            .map_err(|e| format!("Failed to parse '{}': {}", canonical.display(), e))?,
        Some("json") => serde_json::from_str(&contents)
            .map_err(|e| format!("Failed to parse '{}': {}", canonical.display(), e))?,
        _ => {
            return Err(format!(
                "Unsupported config format '{}' (expected .json, .yaml or .yml)",
                canonical.display()
            )
            .into())
        }
    };
    config.validate()?;

    tracing::debug!(path = %canonical.display(), "loaded engine config");
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use std::fs;

    fn write_temp(name: &str, contents: &str) -> String {
        let path = std::env::temp_dir().join(format!("rve-{}-{name}", std::process::id()));
        fs::write(&path, contents).unwrap();
        path.to_string_lossy().into_owned()
    }

    #[test]
    fn test_defaults_without_path() {
        let cfg = load_config(None).unwrap();
        assert_eq!(cfg.solver.max_iterations, 50);
    }

    #[test]
    fn test_yaml_partial_override() {
        let path = write_temp(
            "config.yaml",
            "solver:\n  max_iterations: 75\nviability:\n  marginal_min_score: 2\n",
        );
        let cfg = load_config(Some(&path)).unwrap();
        assert_eq!(cfg.solver.max_iterations, 75);
        assert_eq!(cfg.viability.marginal_min_score, 2);
        assert_eq!(cfg.solver.npv_tolerance, Decimal::from(1000));
        let _ = fs::remove_file(path);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let path = write_temp("bad.json", r#"{ "sensitivity": { "multipliers": ["-1"] } }"#);
        assert!(load_config(Some(&path)).is_err());
        let _ = fs::remove_file(path);
    }

    #[test]
    fn test_unknown_extension_rejected() {
        let path = write_temp("config.toml", "x = 1");
        assert!(load_config(Some(&path)).is_err());
        let _ = fs::remove_file(path);
    }
}
