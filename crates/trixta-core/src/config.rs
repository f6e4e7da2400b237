use crate::channel::{ChannelNaming, DEFAULT_NAMESPACE};
use crate::error::Result;
use crate::instance::InstanceMode;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::Path;

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// InstancePolicy
// ---------------------------------------------------------------------------

/// Retention policy per action / reaction, keyed `<role>:<name>`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InstancePolicy {
    #[serde(default)]
    pub default: InstanceMode,
    #[serde(default)]
    pub overrides: BTreeMap<String, InstanceMode>,
}

impl InstancePolicy {
    pub fn mode_for(&self, role: &str, name: &str) -> InstanceMode {
        self.overrides
            .get(&format!("{role}:{name}"))
            .copied()
            .unwrap_or(self.default)
    }
}

// ---------------------------------------------------------------------------
// EngineConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Channel topic namespace: topics are `<namespace>:<role>`.
    #[serde(default = "default_namespace")]
    pub namespace: String,
    /// Debug flag for submissions that do not set one.
    #[serde(default)]
    pub debug_mode: bool,
    /// Push options merged into action requests when debug mode is active.
    #[serde(default)]
    pub debug_options: Map<String, Value>,
    #[serde(default)]
    pub instances: InstancePolicy,
}

fn default_namespace() -> String {
    DEFAULT_NAMESPACE.to_string()
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
            debug_mode: false,
            debug_options: Map::new(),
            instances: InstancePolicy::default(),
        }
    }
}

impl EngineConfig {
    pub fn with_namespace(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            ..Self::default()
        }
    }

    pub fn naming(&self) -> ChannelNaming {
        ChannelNaming::new(self.namespace.clone())
    }

    // -----------------------------------------------------------------------
    // Persistence
    // -----------------------------------------------------------------------

    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        let cfg: EngineConfig = serde_yaml::from_str(&data)?;
        Ok(cfg)
    }

    /// Load `path` if given, otherwise the defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::default()),
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let data = serde_yaml::to_string(self)?;
        std::fs::write(path, data)?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        if self.namespace.trim().is_empty() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "namespace is empty".into(),
            });
        } else if self.namespace.contains(':') {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: format!(
                    "namespace '{}' contains ':'; topics could not be parsed back to roles",
                    self.namespace
                ),
            });
        }

        if let InstanceMode::Accumulate { limit: Some(0) } = self.instances.default {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "instances.default: accumulate limit=0 keeps only the latest instance"
                    .into(),
            });
        }

        for (key, mode) in &self.instances.overrides {
            match key.split_once(':') {
                Some((role, name)) if !role.is_empty() && !name.is_empty() => {}
                _ => warnings.push(ConfigWarning {
                    level: WarnLevel::Warning,
                    message: format!(
                        "instances.overrides key '{key}' is not of the form <role>:<name>"
                    ),
                }),
            }
            if let InstanceMode::Accumulate { limit: Some(0) } = mode {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Warning,
                    message: format!(
                        "instances.overrides '{key}': accumulate limit=0 keeps only the latest instance"
                    ),
                });
            }
        }

        if !self.debug_mode && !self.debug_options.is_empty() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "debug_options are set but debug_mode is off; they apply only to submissions that enable debug".into(),
            });
        }

        warnings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_roundtrip() {
        let cfg = EngineConfig::default();
        let yaml = serde_yaml::to_string(&cfg).unwrap();
        let parsed: EngineConfig = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed, cfg);
        assert_eq!(parsed.namespace, "trixta_role");
    }

    #[test]
    fn empty_yaml_uses_defaults() {
        let cfg: EngineConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(cfg, EngineConfig::default());
    }

    #[test]
    fn overrides_select_mode_per_role_and_name() {
        let yaml = r#"
namespace: ns
instances:
  default:
    type: replace
  overrides:
    "viewer:alert":
      type: accumulate
      limit: 5
"#;
        let cfg: EngineConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(
            cfg.instances.mode_for("viewer", "alert"),
            InstanceMode::Accumulate { limit: Some(5) }
        );
        assert_eq!(cfg.instances.mode_for("viewer", "ping"), InstanceMode::Replace);
        assert_eq!(cfg.naming().topic("viewer"), "ns:viewer");
    }

    #[test]
    fn save_and_load_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("trixta.yaml");
        let mut cfg = EngineConfig::with_namespace("ns");
        cfg.debug_mode = true;
        cfg.debug_options.insert("trace".into(), Value::Bool(true));
        cfg.save(&path).unwrap();

        let loaded = EngineConfig::load(&path).unwrap();
        assert_eq!(loaded, cfg);
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let dir = TempDir::new().unwrap();
        let err = EngineConfig::load(&dir.path().join("missing.yaml")).unwrap_err();
        assert!(matches!(err, crate::TrixtaError::Io(_)));
    }

    #[test]
    fn load_or_default_without_path() {
        assert_eq!(
            EngineConfig::load_or_default(None).unwrap(),
            EngineConfig::default()
        );
    }

    #[test]
    fn validate_default_config_no_warnings() {
        assert!(EngineConfig::default().validate().is_empty());
    }

    #[test]
    fn validate_namespace_with_separator() {
        let cfg = EngineConfig::with_namespace("a:b");
        let warnings = cfg.validate();
        assert!(warnings
            .iter()
            .any(|w| w.level == WarnLevel::Error && w.message.contains("contains ':'")));
    }

    #[test]
    fn validate_empty_namespace() {
        let cfg = EngineConfig::with_namespace(" ");
        assert!(cfg
            .validate()
            .iter()
            .any(|w| w.message.contains("namespace is empty")));
    }

    #[test]
    fn validate_malformed_override_and_zero_limit() {
        let mut cfg = EngineConfig::default();
        cfg.instances
            .overrides
            .insert("viewer".into(), InstanceMode::Accumulate { limit: Some(0) });
        let warnings = cfg.validate();
        assert!(warnings
            .iter()
            .any(|w| w.message.contains("not of the form <role>:<name>")));
        assert!(warnings.iter().any(|w| w.message.contains("limit=0")));
    }
}
