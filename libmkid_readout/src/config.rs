use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::constants::{DATA_PORT, RECV_BUFFER_BYTES, STREAM_DEPTH};
use super::error::ConfigError;

/// Structure representing the pipeline configuration. Contains pathing and
/// socket tuning. Configs are serializable and deserializable to YAML using
/// serde and serde_yaml.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Memory-backed directory holding control files and flushed images
    pub ramdisk_path: PathBuf,
    /// UDP port the boards transmit to
    pub port: u16,
    /// Kernel receive buffer requested for the UDP socket
    pub recv_buffer_bytes: usize,
    /// Depth, in datagrams, of each inter-worker byte stream
    pub stream_depth: usize,
    /// Image-to-PNG converter invoked per flushed second; None disables it
    pub renderer_path: Option<PathBuf>,
}

impl Default for Config {
    /// Generate a new Config object with the deployed defaults.
    fn default() -> Self {
        Self {
            ramdisk_path: PathBuf::from("/mnt/ramdisk"),
            port: DATA_PORT,
            recv_buffer_bytes: RECV_BUFFER_BYTES,
            stream_depth: STREAM_DEPTH,
            renderer_path: None,
        }
    }
}

impl Config {
    /// Read the configuration in a YAML file
    /// Returns a Config if successful
    pub fn read_config_file(config_path: &Path) -> Result<Self, ConfigError> {
        if !config_path.exists() {
            return Err(ConfigError::BadFilePath(config_path.to_path_buf()));
        }

        let yaml_str = std::fs::read_to_string(config_path)?;

        Ok(serde_yaml::from_str::<Self>(&yaml_str)?)
    }

    /// Path of the image flushed for a given wall-clock second
    pub fn image_path(&self, seconds: u64) -> PathBuf {
        self.ramdisk_path.join(format!("{seconds}.img"))
    }

    /// Path of the rendered PNG for a given wall-clock second
    pub fn png_path(&self, seconds: u64) -> PathBuf {
        self.ramdisk_path.join(format!("{seconds}.png"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yaml_round_trip() {
        let config = Config::default();
        let yaml = serde_yaml::to_string(&config).unwrap();
        let back: Config = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(back.port, config.port);
        assert_eq!(back.ramdisk_path, config.ramdisk_path);
        assert_eq!(back.renderer_path, None);
    }

    #[test]
    fn missing_file_is_reported() {
        let err = Config::read_config_file(Path::new("/nonexistent/config.yaml"));
        assert!(matches!(err, Err(ConfigError::BadFilePath(_))));
    }

    #[test]
    fn image_paths_are_per_second() {
        let config = Config::default();
        assert_eq!(
            config.image_path(1451606400),
            PathBuf::from("/mnt/ramdisk/1451606400.img")
        );
        assert_eq!(
            config.png_path(1451606400),
            PathBuf::from("/mnt/ramdisk/1451606400.png")
        );
    }
}
