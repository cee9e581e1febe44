//! ---
//! fl_section: "01-core-functionality"
//! fl_subsection: "module"
//! fl_type: "source"
//! fl_scope: "code"
//! fl_description: "Device identity derived from a hardware-unique id."
//! fl_version: "v0.1.0"
//! fl_owner: "tbd"
//! ---
use std::fmt;
use std::fs;

use anyhow::{anyhow, Context, Result};

use crate::config::{DeviceConfig, HardwareIdFormat};

/// Identifier used as the session client id and the telemetry `device_id`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeviceIdentity(String);

impl DeviceIdentity {
    /// Prefix plus lowercase hex of the raw hardware id bytes.
    pub fn from_hardware_bytes(prefix: &str, hardware_id: &[u8]) -> Self {
        Self(format!("{}{}", prefix, hex::encode(hardware_id)))
    }

    /// Resolve the identity from a literal id or the id file.
    ///
    /// With [`HardwareIdFormat::Hex`] the id must be hex text and ends up
    /// lowercased; with [`HardwareIdFormat::Text`] its bytes are hex-encoded.
    pub fn from_config(config: &DeviceConfig) -> Result<Self> {
        let raw = match &config.hardware_id {
            Some(literal) => literal.clone(),
            None => fs::read_to_string(&config.hardware_id_path).with_context(|| {
                format!(
                    "unable to read hardware id from {}",
                    config.hardware_id_path.display()
                )
            })?,
        };
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(anyhow!("hardware id is empty"));
        }
        match config.hardware_id_format {
            HardwareIdFormat::Hex => {
                let bytes = hex::decode(trimmed).with_context(|| {
                    format!("hardware id {trimmed:?} is not hex; set hardware_id_format = \"text\"")
                })?;
                Ok(Self::from_hardware_bytes(&config.id_prefix, &bytes))
            }
            HardwareIdFormat::Text => Ok(Self::from_hardware_bytes(
                &config.id_prefix,
                trimmed.as_bytes(),
            )),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_bytes_are_hex_encoded() {
        let id = DeviceIdentity::from_hardware_bytes("DEV_", &[0x24, 0x0a, 0xc4]);
        assert_eq!(id.as_str(), "DEV_240ac4");
    }

    #[test]
    fn hex_text_is_normalised() {
        let config = DeviceConfig {
            id_prefix: "FL_".into(),
            hardware_id: Some("  A1B2C3\n".into()),
            ..DeviceConfig::default()
        };
        assert_eq!(DeviceIdentity::from_config(&config).unwrap().as_str(), "FL_a1b2c3");
    }

    #[test]
    fn id_file_is_read_and_trimmed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("machine-id");
        fs::write(&path, "serial-7\n").unwrap();
        let config = DeviceConfig {
            id_prefix: "FL_".into(),
            hardware_id: None,
            hardware_id_path: path,
            hardware_id_format: HardwareIdFormat::Text,
        };
        let id = DeviceIdentity::from_config(&config).unwrap();
        assert_eq!(id.to_string(), format!("FL_{}", hex::encode("serial-7")));
    }

    #[test]
    fn hex_looking_text_id_keeps_its_characters() {
        let config = DeviceConfig {
            id_prefix: "FL_".into(),
            hardware_id: Some("cafe".into()),
            hardware_id_format: HardwareIdFormat::Text,
            ..DeviceConfig::default()
        };
        assert_eq!(DeviceIdentity::from_config(&config).unwrap().as_str(), "FL_63616665");
    }

    #[test]
    fn non_hex_id_in_hex_format_is_rejected() {
        let config = DeviceConfig {
            hardware_id: Some("serial-7".into()),
            ..DeviceConfig::default()
        };
        let err = DeviceIdentity::from_config(&config).unwrap_err();
        assert!(format!("{err:#}").contains("hardware_id_format"));
    }

    #[test]
    fn empty_id_is_rejected() {
        let config = DeviceConfig {
            hardware_id: Some("   ".into()),
            ..DeviceConfig::default()
        };
        assert!(DeviceIdentity::from_config(&config).is_err());
    }
}
