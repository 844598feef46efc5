//! INI file configuration adapter.

use crate::domain::error::AggregatorError;
use crate::ports::config_port::ConfigPort;
use configparser::ini::Ini;
use std::path::Path;

pub struct FileConfigAdapter {
    config: Ini,
}

impl FileConfigAdapter {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, AggregatorError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        Self::from_string(&content).map_err(|reason| AggregatorError::ConfigParse {
            file: path.display().to_string(),
            reason,
        })
    }

    pub fn from_string(content: &str) -> Result<Self, String> {
        let mut config = Ini::new();
        config.read(content.to_string())?;
        Ok(Self { config })
    }

    fn parse_bool(value: &str) -> Option<bool> {
        match value.to_lowercase().as_str() {
            "true" | "yes" | "1" => Some(true),
            "false" | "no" | "0" => Some(false),
            _ => None,
        }
    }
}

impl ConfigPort for FileConfigAdapter {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        self.config.get(section, key)
    }

    fn get_int(&self, section: &str, key: &str, default: i64) -> i64 {
        self.config
            .getint(section, key)
            .ok()
            .flatten()
            .unwrap_or(default)
    }

    fn get_double(&self, section: &str, key: &str, default: f64) -> f64 {
        self.config
            .getfloat(section, key)
            .ok()
            .flatten()
            .unwrap_or(default)
    }

    fn get_bool(&self, section: &str, key: &str, default: bool) -> bool {
        self.config
            .get(section, key)
            .as_ref()
            .and_then(|v| Self::parse_bool(v))
            .unwrap_or(default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", content).unwrap();
        file
    }

    #[test]
    fn from_string_parses_config() {
        let content = r#"
[batch]
benchmark = ^GSPC
symbol_column = Ticker

[metrics]
risk_free_rate = 0.02
trading_days_per_year = 252
"#;
        let adapter = FileConfigAdapter::from_string(content).unwrap();
        assert_eq!(
            adapter.get_string("batch", "benchmark"),
            Some("^GSPC".to_string())
        );
        assert_eq!(
            adapter.get_string("batch", "symbol_column"),
            Some("Ticker".to_string())
        );
    }

    #[test]
    fn get_string_returns_none_for_missing_key() {
        let adapter = FileConfigAdapter::from_string("[batch]\nbenchmark = ^DJI\n").unwrap();
        assert_eq!(adapter.get_string("batch", "missing"), None);
        assert_eq!(adapter.get_string("missing_section", "key"), None);
    }

    #[test]
    fn get_int_returns_value() {
        let adapter = FileConfigAdapter::from_string("[pacing]\nmax_retries = 5\n").unwrap();
        assert_eq!(adapter.get_int("pacing", "max_retries", 0), 5);
    }

    #[test]
    fn get_int_returns_default_for_missing() {
        let adapter = FileConfigAdapter::from_string("[pacing]\n").unwrap();
        assert_eq!(adapter.get_int("pacing", "missing", 42), 42);
    }

    #[test]
    fn get_int_returns_default_for_non_numeric() {
        let adapter = FileConfigAdapter::from_string("[pacing]\nmax_retries = abc\n").unwrap();
        assert_eq!(adapter.get_int("pacing", "max_retries", 42), 42);
    }

    #[test]
    fn get_double_returns_value() {
        let adapter =
            FileConfigAdapter::from_string("[metrics]\nrisk_free_rate = 0.035\n").unwrap();
        assert_eq!(adapter.get_double("metrics", "risk_free_rate", 0.0), 0.035);
    }

    #[test]
    fn get_double_returns_default_for_non_numeric() {
        let adapter =
            FileConfigAdapter::from_string("[metrics]\nrisk_free_rate = not_a_number\n").unwrap();
        assert_eq!(adapter.get_double("metrics", "risk_free_rate", 0.02), 0.02);
    }

    #[test]
    fn get_bool_returns_true_values() {
        let adapter =
            FileConfigAdapter::from_string("[pacing]\na = true\nb = yes\nc = 1\n").unwrap();
        assert!(adapter.get_bool("pacing", "a", false));
        assert!(adapter.get_bool("pacing", "b", false));
        assert!(adapter.get_bool("pacing", "c", false));
    }

    #[test]
    fn get_bool_returns_false_values() {
        let adapter =
            FileConfigAdapter::from_string("[pacing]\na = false\nb = no\nc = 0\n").unwrap();
        assert!(!adapter.get_bool("pacing", "a", true));
        assert!(!adapter.get_bool("pacing", "b", true));
        assert!(!adapter.get_bool("pacing", "c", true));
    }

    #[test]
    fn get_bool_returns_default_for_missing() {
        let adapter = FileConfigAdapter::from_string("[pacing]\n").unwrap();
        assert!(adapter.get_bool("pacing", "enabled", true));
        assert!(!adapter.get_bool("pacing", "enabled", false));
    }

    #[test]
    fn from_file_reads_config() {
        let file = create_temp_config("[source]\nprovider = csv\ndata_dir = /var/prices\n");
        let adapter = FileConfigAdapter::from_file(file.path()).unwrap();
        assert_eq!(
            adapter.get_string("source", "data_dir"),
            Some("/var/prices".to_string())
        );
    }

    #[test]
    fn from_file_returns_error_for_missing_file() {
        let result = FileConfigAdapter::from_file("/nonexistent/path/config.ini");
        assert!(matches!(result, Err(AggregatorError::Io(_))));
    }
}
