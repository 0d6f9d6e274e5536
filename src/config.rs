//! Configuration loaded from TOML, every field defaulted.

use std::path::Path;
use std::time::Duration;

use derive_getters::Getters;
use derive_more::{Display, Error};
use derive_setters::Setters;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

/// Which peer transport the runtime uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TransportKind {
    /// Direct TCP between two processes.
    #[default]
    Tcp,
    /// In-process registry, both peers in one process.
    Memory,
}

/// CPU opponent settings.
#[derive(Debug, Clone, PartialEq, Getters, Setters, Serialize, Deserialize)]
#[serde(default)]
#[setters(prefix = "with_")]
pub struct CpuConfig {
    /// Pause before the CPU plays, in milliseconds.
    delay_ms: u64,
    /// Probability of a deliberate random move.
    mistake_rate: f64,
}

impl Default for CpuConfig {
    fn default() -> Self {
        Self {
            delay_ms: 700,
            mistake_rate: duel_board::CpuStrategy::DEFAULT_MISTAKE_RATE,
        }
    }
}

impl CpuConfig {
    /// The CPU pause as a [`Duration`].
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

/// Peer connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Getters, Setters, Serialize, Deserialize)]
#[serde(default)]
#[setters(prefix = "with_")]
pub struct NetworkConfig {
    /// Literal prefix of every peer identifier.
    peer_prefix: String,
    /// Transport implementation.
    transport: TransportKind,
    /// Interface a host listens on.
    bind_host: String,
    /// Address a joiner dials.
    peer_host: String,
    /// First port of the room-code port range.
    base_port: u16,
    /// Number of ports room codes are spread over.
    port_span: u16,
    /// Give up dialing after this many milliseconds.
    connect_timeout_ms: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            peer_prefix: "tictactoe-".to_string(),
            transport: TransportKind::Tcp,
            bind_host: "0.0.0.0".to_string(),
            peer_host: "127.0.0.1".to_string(),
            base_port: 41000,
            port_span: 20000,
            connect_timeout_ms: 5000,
        }
    }
}

impl NetworkConfig {
    /// The dial timeout as a [`Duration`].
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

/// Log output settings.
#[derive(Debug, Clone, PartialEq, Eq, Getters, Setters, Serialize, Deserialize)]
#[serde(default)]
#[setters(prefix = "with_")]
pub struct LoggingConfig {
    /// Log file; the terminal belongs to the frontend.
    file: String,
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            file: "tictactoe_duel.log".to_string(),
            filter: "info".to_string(),
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Default, Getters, Setters, Serialize, Deserialize)]
#[serde(default)]
#[setters(prefix = "with_")]
pub struct DuelConfig {
    /// CPU opponent.
    cpu: CpuConfig,
    /// Peer connection.
    network: NetworkConfig,
    /// Logging.
    logging: LoggingConfig,
}

impl DuelConfig {
    /// Loads configuration from a TOML file.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        debug!("Loading config from file");
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::new(format!("Failed to read config file: {}", e)))?;
        let config = Self::from_toml(&content)?;
        info!(transport = %config.network.transport, "Config loaded successfully");
        Ok(config)
    }

    /// Loads configuration from a file if it exists, defaults otherwise.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        if path.as_ref().exists() {
            Self::from_file(path)
        } else {
            info!("No config file, using defaults");
            Ok(Self::default())
        }
    }

    /// Parses configuration from a TOML string.
    #[instrument(skip(content))]
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)
            .map_err(|e| ConfigError::new(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Serializes the configuration back to TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self)
            .map_err(|e| ConfigError::new(format!("Failed to serialize config: {}", e)))
    }

    /// Checks value ranges. Files are validated on load; call this after
    /// changing a loaded config in code.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.cpu.mistake_rate) {
            return Err(ConfigError::new(format!(
                "cpu.mistake_rate must be within 0.0..=1.0, got {}",
                self.cpu.mistake_rate
            )));
        }
        if self.network.port_span == 0 {
            return Err(ConfigError::new("network.port_span must be positive".to_string()));
        }
        if u32::from(self.network.base_port) + u32::from(self.network.port_span) > 65536 {
            return Err(ConfigError::new(format!(
                "network.base_port + network.port_span exceeds 65535 ({} + {})",
                self.network.base_port, self.network.port_span
            )));
        }
        Ok(())
    }
}

/// Configuration error.
#[derive(Debug, Clone, Display, Error)]
#[display("Config error: {} at {}:{}", message, file, line)]
pub struct ConfigError {
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl ConfigError {
    /// Creates a new configuration error.
    #[track_caller]
    pub fn new(message: String) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            message,
            line: loc.line(),
            file: loc.file(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_toml_yields_defaults() {
        let config = DuelConfig::from_toml("").unwrap();
        assert_eq!(config, DuelConfig::default());
        assert_eq!(*config.cpu().delay_ms(), 700);
        assert_eq!(config.network().peer_prefix(), "tictactoe-");
    }

    #[test]
    fn test_partial_sections_keep_other_defaults() {
        let config = DuelConfig::from_toml(
            r#"
            [cpu]
            delay_ms = 0

            [network]
            transport = "memory"
            "#,
        )
        .unwrap();
        assert_eq!(*config.cpu().delay_ms(), 0);
        assert_eq!(*config.cpu().mistake_rate(), 0.25);
        assert_eq!(*config.network().transport(), TransportKind::Memory);
        assert_eq!(*config.network().base_port(), 41000);
    }

    #[test]
    fn test_rejects_bad_mistake_rate() {
        let err = DuelConfig::from_toml("[cpu]\nmistake_rate = 1.5\n").unwrap_err();
        assert!(err.message.contains("mistake_rate"));
    }

    #[test]
    fn test_rejects_port_overflow() {
        let err =
            DuelConfig::from_toml("[network]\nbase_port = 60000\nport_span = 10000\n").unwrap_err();
        assert!(err.message.contains("exceeds"));
    }

    #[test]
    fn test_round_trip_through_toml() {
        let config = DuelConfig::default()
            .with_cpu(CpuConfig::default().with_delay_ms(10))
            .with_network(NetworkConfig::default().with_base_port(40000));
        config.validate().unwrap();
        let text = config.to_toml().unwrap();
        assert_eq!(DuelConfig::from_toml(&text).unwrap(), config);
    }

    #[test]
    fn test_validate_catches_builder_overflow() {
        let config = DuelConfig::default()
            .with_network(NetworkConfig::default().with_base_port(50000));
        let err = config.validate().unwrap_err();
        assert!(err.message.contains("50000 + 20000"));
        assert!(DuelConfig::from_toml(&config.to_toml().unwrap()).is_err());
    }
}
