//! ---
//! fl_section: "04-modem-bringup"
//! fl_subsection: "module"
//! fl_type: "source"
//! fl_scope: "code"
//! fl_description: "Certificate and key artifacts uploaded to the modem store."
//! fl_version: "v0.1.0"
//! fl_owner: "tbd"
//! ---
use std::fmt;
use std::fs;
use std::path::Path;

use fieldlink_common::TlsConfig;

use crate::error::ArtifactError;

/// The three fixed artifact slots, in upload order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactRole {
    TrustAnchor,
    DeviceCertificate,
    DeviceKey,
}

impl ArtifactRole {
    pub const ALL: [ArtifactRole; 3] = [
        ArtifactRole::TrustAnchor,
        ArtifactRole::DeviceCertificate,
        ArtifactRole::DeviceKey,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactRole::TrustAnchor => "trust anchor",
            ArtifactRole::DeviceCertificate => "device certificate",
            ArtifactRole::DeviceKey => "device key",
        }
    }
}

impl fmt::Display for ArtifactRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Name in the peripheral store plus exact bytes to upload.
#[derive(Clone, PartialEq, Eq)]
pub struct ArtifactRecord {
    role: ArtifactRole,
    name: String,
    content: Vec<u8>,
}

impl ArtifactRecord {
    pub fn new(role: ArtifactRole, name: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            role,
            name: name.into(),
            content: content.into(),
        }
    }

    pub fn role(&self) -> ArtifactRole {
        self.role
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn content(&self) -> &[u8] {
        &self.content
    }

    pub fn len(&self) -> usize {
        self.content.len()
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    fn contains(&self, marker: &str) -> bool {
        !marker.is_empty()
            && self
                .content
                .windows(marker.len())
                .any(|window| window == marker.as_bytes())
    }
}

// key material stays out of logs
impl fmt::Debug for ArtifactRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArtifactRecord")
            .field("role", &self.role)
            .field("name", &self.name)
            .field("len", &self.content.len())
            .finish()
    }
}

/// Trust anchor, device certificate, and device key, always in that order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactSet {
    records: [ArtifactRecord; 3],
}

impl ArtifactSet {
    pub fn new(
        trust_anchor: ArtifactRecord,
        device_certificate: ArtifactRecord,
        device_key: ArtifactRecord,
    ) -> Self {
        Self {
            records: [trust_anchor, device_certificate, device_key],
        }
    }

    /// Read the three PEM files named in `[tls]`, trimmed of surrounding whitespace.
    pub fn from_config(tls: &TlsConfig) -> Result<Self, ArtifactError> {
        let load = |role: ArtifactRole, path: Option<&Path>, name: &str| {
            let path = path.ok_or(ArtifactError::NotConfigured { role })?;
            let text = fs::read_to_string(path).map_err(|source| ArtifactError::Unreadable {
                role,
                path: path.to_path_buf(),
                source,
            })?;
            Ok::<_, ArtifactError>(ArtifactRecord::new(role, name, text.trim().as_bytes()))
        };
        let set = Self::new(
            load(
                ArtifactRole::TrustAnchor,
                tls.ca_cert.as_deref(),
                &tls.ca_cert_name,
            )?,
            load(
                ArtifactRole::DeviceCertificate,
                tls.client_cert.as_deref(),
                &tls.client_cert_name,
            )?,
            load(
                ArtifactRole::DeviceKey,
                tls.client_key.as_deref(),
                &tls.client_key_name,
            )?,
        );
        set.validate(&tls.placeholder_marker)?;
        Ok(set)
    }

    pub fn records(&self) -> &[ArtifactRecord] {
        &self.records
    }

    pub fn get(&self, role: ArtifactRole) -> &ArtifactRecord {
        match role {
            ArtifactRole::TrustAnchor => &self.records[0],
            ArtifactRole::DeviceCertificate => &self.records[1],
            ArtifactRole::DeviceKey => &self.records[2],
        }
    }

    /// Reject empty artifacts and ones that still hold `placeholder_marker`.
    pub fn validate(&self, placeholder_marker: &str) -> Result<(), ArtifactError> {
        for record in &self.records {
            if record.is_empty() {
                return Err(ArtifactError::Empty { role: record.role });
            }
            if record.contains(placeholder_marker) {
                return Err(ArtifactError::Placeholder { role: record.role });
            }
        }
        Ok(())
    }
}
