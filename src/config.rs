/// Library configuration loaded from TOML
///
/// ```toml
/// [voting]
/// strategy = "consensus"
/// min_confidence = 95
///
/// [save]
/// compression = "zstd"
/// ```

use crate::error::{IrError, Result};
use crate::io::SaveOptions;
use crate::vote::VotingParams;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Voting and save settings; missing sections and keys take their defaults
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FluxConfig {
    /// Multi-revolution voting
    pub voting: VotingParams,
    /// IR file output
    pub save: SaveOptions,
}

impl FluxConfig {
    /// Parse a TOML document
    pub fn from_toml(text: &str) -> Result<Self> {
        let config: FluxConfig =
            toml::from_str(text).map_err(|e| IrError::invalid(format!("config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml(&text)
    }

    /// Render as TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string(self).map_err(|e| IrError::invalid(format!("config: {}", e)))
    }

    /// Check the settings are usable
    pub fn validate(&self) -> Result<()> {
        self.voting
            .validate()
            .map_err(|e| IrError::invalid(format!("voting: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::Compression;
    use crate::vote::VoteStrategy;
    use std::io::Write;

    #[test]
    fn test_empty_is_default() {
        assert_eq!(FluxConfig::from_toml("").unwrap(), FluxConfig::default());
    }

    #[test]
    fn test_partial_sections() {
        let config = FluxConfig::from_toml(
            r#"
            [voting]
            strategy = "consensus"
            min_confidence = 95

            [save]
            compression = "zstd"
            "#,
        )
        .unwrap();
        assert_eq!(config.voting.strategy, VoteStrategy::Consensus);
        assert_eq!(config.voting.min_confidence, 95);
        assert_eq!(config.voting.weak_threshold, 60);
        assert_eq!(config.save.compression, Compression::Zstd);
        assert!(config.save.revolution_table);
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(FluxConfig::from_toml("[voting]\nmin_confidence = 40\n").is_err());
        assert!(FluxConfig::from_toml("[voting]\nstrategy = \"loudest\"\n").is_err());
        assert!(FluxConfig::from_toml("[save]\ncompression = 3\n").is_err());
    }

    #[test]
    fn test_round_trip_and_file() {
        let config = FluxConfig {
            voting: VotingParams::majority(),
            save: SaveOptions::with_compression(Compression::Delta),
        };
        let text = config.to_toml().unwrap();
        assert_eq!(FluxConfig::from_toml(&text).unwrap(), config);

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(text.as_bytes()).unwrap();
        assert_eq!(FluxConfig::from_file(file.path()).unwrap(), config);
        assert!(FluxConfig::from_file("/nonexistent/fluxcore.toml").is_err());
    }
}
