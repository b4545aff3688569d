//! Configuration from environment variables.
//!
//! Load configuration using `Config::from_env()` after calling `dotenvy::dotenv()`.

use std::path::PathBuf;

use crate::core::codegen::GeneratorKind;
use crate::core::error::ValidationError;

pub const DEFAULT_GENERATOR: &str = "mysql";
pub const DEFAULT_LOG_FILTER: &str = "info";

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Canvas JSON file used when none is given on the command line
    pub canvas_path: Option<PathBuf>,

    /// Generator tag, one of `ORM/SQLAlchemy`, `mysql`, `sqlite`
    pub generator: String,

    /// tracing filter directive, e.g. `info` or `dbdesigner=debug`
    pub log_filter: String,
}

impl Config {
    /// Reads `DBDESIGNER_CANVAS`, `DBDESIGNER_GENERATOR` and `DBDESIGNER_LOG`.
    ///
    /// Call `dotenvy::dotenv()` before this to load from `.env` file.
    pub fn from_env() -> Self {
        Self {
            canvas_path: std::env::var("DBDESIGNER_CANVAS").ok().map(PathBuf::from),
            generator: std::env::var("DBDESIGNER_GENERATOR")
                .unwrap_or_else(|_| DEFAULT_GENERATOR.to_string()),
            log_filter: std::env::var("DBDESIGNER_LOG")
                .unwrap_or_else(|_| DEFAULT_LOG_FILTER.to_string()),
        }
    }

    pub fn has_canvas(&self) -> bool {
        self.canvas_path.is_some()
    }

    pub fn generator_kind(&self) -> Result<GeneratorKind, ValidationError> {
        self.generator.parse()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            canvas_path: None,
            generator: DEFAULT_GENERATOR.to_string(),
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // no env var access here, tests run in parallel

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(!config.has_canvas());
        assert_eq!(config.generator_kind(), Ok(GeneratorKind::MySql));
        assert_eq!(config.log_filter, "info");
    }

    #[test]
    fn test_generator_kind_parsing() {
        let config = Config {
            generator: "ORM/SQLAlchemy".to_string(),
            ..Config::default()
        };
        assert_eq!(config.generator_kind(), Ok(GeneratorKind::SqlAlchemy));

        let config = Config {
            generator: "oracle".to_string(),
            ..Config::default()
        };
        assert_eq!(
            config.generator_kind(),
            Err(ValidationError::UnknownGenerator("oracle".into()))
        );
    }

    #[test]
    fn test_has_canvas() {
        let config = Config {
            canvas_path: Some(PathBuf::from("schema.json")),
            ..Config::default()
        };
        assert!(config.has_canvas());
    }
}
