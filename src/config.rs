use crate::detector::{Precedence, PrecedenceError, ViolationKind};
use crate::engine::{Engine, EngineConfig};
use crate::errors::EngineError;
use crate::lifecycle::AuthorizationPolicy;
use anyhow::Result;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default configuration file looked up in the working directory
pub const CONFIG_FILE: &str = "commitment-consistency.toml";
/// Prefix for environment overrides, e.g. `COMMITMENT_CONSISTENCY_ENGINE__PARALLEL=false`
pub const ENV_PREFIX: &str = "COMMITMENT_CONSISTENCY";

/// Main configuration structure for the consistency engine
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Who may act on commitments they do not own
    pub authorization: AuthorizationSettings,
    /// Violation tie-breaking
    pub detector: DetectorSettings,
    /// Execution settings
    pub engine: ExecutionSettings,
    /// Optional feasibility solver
    pub solver: SolverSettings,
    /// Logging settings
    pub observability: ObservabilitySettings,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthorizationSettings {
    /// People allowed to act on behalf of any owner
    pub facilitators: Vec<String>,
    /// Apply the owner check to CONFIRM and REVISE as well as CANCEL
    pub authorize_all_acts: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct DetectorSettings {
    /// Violation kinds from highest to lowest priority
    pub precedence: Vec<ViolationKind>,
}

impl Default for DetectorSettings {
    fn default() -> Self {
        Self {
            precedence: Precedence::default().order().to_vec(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ExecutionSettings {
    /// Run commitments and meetings on the rayon thread pool
    pub parallel: bool,
}

impl Default for ExecutionSettings {
    fn default() -> Self {
        Self { parallel: true }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SolverSettings {
    /// Time budget handed to the solver per commitment
    pub budget_ms: u64,
}

impl Default for SolverSettings {
    fn default() -> Self {
        Self { budget_ms: 1000 }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilitySettings {
    /// Log filter directive, overridden by RUST_LOG
    pub log_level: String,
    /// Emit JSON log lines instead of compact text
    pub json: bool,
}

impl Default for ObservabilitySettings {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json: false,
        }
    }
}

impl EngineSettings {
    /// Load configuration from multiple sources with precedence:
    /// 1. Default values
    /// 2. Configuration file (`path`, or commitment-consistency.toml if present)
    /// 3. Environment variables (prefixed with COMMITMENT_CONSISTENCY_)
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();

        match path {
            Some(path) => {
                builder = builder.add_source(File::from(path).required(true));
            }
            None => {
                if Path::new(CONFIG_FILE).exists() {
                    builder = builder.add_source(File::from(Path::new(CONFIG_FILE)));
                }
            }
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("authorization.facilitators")
                .with_list_parse_key("detector.precedence"),
        );

        let config = builder.build()?;
        let settings: EngineSettings = config.try_deserialize()?;
        Ok(settings)
    }

    /// Save configuration to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let toml_content = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_content)?;
        Ok(())
    }

    /// Load .env file if it exists
    pub fn load_env_file() -> Result<()> {
        if Path::new(".env").exists() {
            dotenvy::dotenv()?;
            tracing::info!("Loaded environment variables from .env file");
        }
        Ok(())
    }

    /// Validate and convert into the engine's construction-time settings
    pub fn engine_config(&self) -> Result<EngineConfig, PrecedenceError> {
        Ok(EngineConfig {
            policy: AuthorizationPolicy::new(
                self.authorization.facilitators.iter().map(String::as_str),
                self.authorization.authorize_all_acts,
            ),
            precedence: Precedence::new(self.detector.precedence.clone())?,
            parallel: self.engine.parallel,
            solver_budget: Duration::from_millis(self.solver.budget_ms),
        })
    }

    pub fn build_engine(&self) -> Result<Engine, EngineError> {
        Ok(Engine::new(self.engine_config()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::Person;

    #[test]
    fn test_default_settings_match_engine_defaults() {
        let config = EngineSettings::default().engine_config().unwrap();
        assert_eq!(config.precedence, Precedence::default());
        assert!(config.parallel);
        assert!(config.policy.facilitators.is_empty());
        assert!(!config.policy.authorize_all_acts);
        assert_eq!(config.solver_budget, Duration::from_millis(1000));
    }

    #[test]
    fn test_load_from_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.toml");
        std::fs::write(
            &path,
            r#"
[authorization]
facilitators = ["Chair", "Secretary"]
authorize_all_acts = true

[engine]
parallel = false
"#,
        )
        .unwrap();

        let settings = EngineSettings::load(Some(&path)).unwrap();
        assert_eq!(settings.authorization.facilitators, vec!["Chair", "Secretary"]);
        assert!(!settings.engine.parallel);
        assert_eq!(settings.detector, DetectorSettings::default());

        let config = settings.engine_config().unwrap();
        assert!(config.policy.is_facilitator(&Person::new("Chair")));
        assert!(config.policy.authorize_all_acts);
    }

    #[test]
    fn test_precedence_from_file_must_be_complete() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.toml");
        std::fs::write(
            &path,
            "[detector]\nprecedence = [\"invalid_transition\", \"unauthorized_cancel\"]\n",
        )
        .unwrap();

        let settings = EngineSettings::load(Some(&path)).unwrap();
        assert!(matches!(
            settings.build_engine(),
            Err(EngineError::Precedence(PrecedenceError::WrongLength { found: 2, .. }))
        ));
    }

    #[test]
    fn test_save_and_reload_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("saved.toml");
        let mut settings = EngineSettings::default();
        settings.authorization.facilitators = vec!["Chair".to_string()];
        settings.solver.budget_ms = 250;

        settings.save_to_file(&path).unwrap();
        let reloaded = EngineSettings::load(Some(&path)).unwrap();
        assert_eq!(reloaded, settings);
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(EngineSettings::load(Some(&dir.path().join("absent.toml"))).is_err());
    }
}
