use std::env;
use std::num::ParseIntError;

/// Smallest receive buffer we accept; a single envelope with a descriptor
/// must fit in one frame.
const MIN_RECEIVE_MTU: usize = 1024;

/// Tuning knobs for one transport endpoint.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Maximum size of one inbound frame.
    pub receive_mtu: usize,
    /// Capacity of the outbound and consumer channels. 1 keeps hand-off
    /// semantics close to an unbuffered channel.
    pub channel_capacity: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            receive_mtu: 8192,
            channel_capacity: 1,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidMtu(String, ParseIntError),
    MtuOutOfRange(usize),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::InvalidMtu(val, err) => {
                write!(
                    f,
                    "METADATA_RECEIVE_MTU must be a valid size (got '{}': {})",
                    val, err
                )
            }
            ConfigError::MtuOutOfRange(mtu) => {
                write!(
                    f,
                    "METADATA_RECEIVE_MTU must be at least {} (got {})",
                    MIN_RECEIVE_MTU, mtu
                )
            }
        }
    }
}

impl std::error::Error for ConfigError {}

impl TransportConfig {
    /// Builds a config from the environment, falling back to defaults.
    /// Returns an error if a set variable is present but invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        // Optional: METADATA_RECEIVE_MTU (defaults to 8192)
        if let Ok(mtu_str) = env::var("METADATA_RECEIVE_MTU") {
            let mtu: usize = mtu_str
                .parse()
                .map_err(|e| ConfigError::InvalidMtu(mtu_str.clone(), e))?;

            if mtu < MIN_RECEIVE_MTU {
                return Err(ConfigError::MtuOutOfRange(mtu));
            }

            config.receive_mtu = mtu;
        } else {
            tracing::warn!(
                "METADATA_RECEIVE_MTU not set, using default: {}",
                config.receive_mtu
            );
        }

        tracing::info!(
            receive_mtu = config.receive_mtu,
            channel_capacity = config.channel_capacity,
            "Transport configuration"
        );

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    use std::sync::Mutex;

    lazy_static::lazy_static! {
        static ref ENV_MUTEX: Mutex<()> = Mutex::new(());
    }

    // Helper to set up and tear down environment variables for tests
    struct EnvGuard<'a> {
        vars: Vec<String>,
        _guard: std::sync::MutexGuard<'a, ()>,
    }

    impl<'a> EnvGuard<'a> {
        fn new() -> Self {
            let guard = ENV_MUTEX.lock().unwrap();
            EnvGuard {
                vars: Vec::new(),
                _guard: guard,
            }
        }

        fn set(&mut self, key: &str, value: &str) {
            env::set_var(key, value);
            self.vars.push(key.to_string());
        }

        fn unset(&mut self, key: &str) {
            env::remove_var(key);
            self.vars.push(key.to_string());
        }
    }

    impl<'a> Drop for EnvGuard<'a> {
        fn drop(&mut self) {
            for var in &self.vars {
                env::remove_var(var);
            }
        }
    }

    #[test]
    fn test_from_env_defaults() {
        let mut guard = EnvGuard::new();
        guard.unset("METADATA_RECEIVE_MTU");

        let config = TransportConfig::from_env().expect("Expected valid configuration");
        assert_eq!(config.receive_mtu, 8192);
        assert_eq!(config.channel_capacity, 1);
    }

    #[test]
    fn test_from_env_valid_mtu() {
        let mut guard = EnvGuard::new();
        guard.set("METADATA_RECEIVE_MTU", "16384");

        let config = TransportConfig::from_env().expect("Expected valid configuration");
        assert_eq!(config.receive_mtu, 16384);
    }

    #[test]
    fn test_from_env_invalid_mtu() {
        let mut guard = EnvGuard::new();
        guard.set("METADATA_RECEIVE_MTU", "not-a-number");

        let result = TransportConfig::from_env();
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(matches!(err, ConfigError::InvalidMtu(_, _)));
        assert!(err.to_string().contains("must be a valid size"));
    }

    #[test]
    fn test_from_env_mtu_out_of_range() {
        let mut guard = EnvGuard::new();
        guard.set("METADATA_RECEIVE_MTU", "100");

        let result = TransportConfig::from_env();
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(matches!(err, ConfigError::MtuOutOfRange(_)));
        assert!(err.to_string().contains("must be at least"));
    }
}
