use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

/// Directory holding joystick nodes on Linux.
pub const DEFAULT_DEVICE_DIR: &str = "/dev/input";

/// Node name prefix of joystick devices.
pub const DEFAULT_NAME_PREFIX: &str = "js";

/// Tunables for a [`crate::Bus`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BusOptions {
    /// Directory scanned and watched for device nodes.
    pub device_dir: PathBuf,
    /// Entries whose name does not start with this prefix are ignored.
    pub name_prefix: String,
    /// Open attempts made while the node reports permission denied.
    pub open_attempts: u32,
    /// Delay between open attempts.
    pub open_backoff_ms: u64,
    /// Upper bound on one blocking watch read, and so on shutdown latency.
    pub watch_poll_ms: u64,
    /// How long `close` waits for a reader of shutdown errors.
    pub shutdown_grace_ms: u64,
}

impl Default for BusOptions {
    fn default() -> Self {
        Self {
            device_dir: PathBuf::from(DEFAULT_DEVICE_DIR),
            name_prefix: DEFAULT_NAME_PREFIX.to_string(),
            open_attempts: 5,
            open_backoff_ms: 200,
            watch_poll_ms: 250,
            shutdown_grace_ms: 200,
        }
    }
}

impl BusOptions {
    pub fn with_device_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.device_dir = dir.into();
        self
    }

    pub fn with_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.name_prefix = prefix.into();
        self
    }

    pub fn open_backoff(&self) -> Duration {
        Duration::from_millis(self.open_backoff_ms)
    }

    pub fn watch_poll(&self) -> Duration {
        Duration::from_millis(self.watch_poll_ms)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_joystick_layout() {
        let options = BusOptions::default();
        assert_eq!(options.device_dir, PathBuf::from("/dev/input"));
        assert_eq!(options.name_prefix, "js");
        assert_eq!(options.open_attempts, 5);
        assert_eq!(options.open_backoff(), Duration::from_millis(200));
    }

    #[test]
    fn partial_yaml_keeps_defaults() {
        let input = "device_dir: /tmp/input\nopen_attempts: 2\n";
        let options: BusOptions = serde_yaml::from_str(input).unwrap();
        assert_eq!(options.device_dir, PathBuf::from("/tmp/input"));
        assert_eq!(options.open_attempts, 2);
        assert_eq!(options.name_prefix, "js");
        assert_eq!(options.watch_poll_ms, 250);
    }
}
