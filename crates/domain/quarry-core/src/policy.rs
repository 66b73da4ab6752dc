use serde::{Deserialize, Serialize};

/// What to do with a downloaded file whose digest disagrees with the
/// checksum companions fetched from the same remote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChecksumSetting {
    /// Accept the download without verification.
    Ignore,
    /// Log the mismatch, accept the download anyway.
    Warn,
    /// Reject the download; the connector behaves as if the resource
    /// were not found.
    Fail,
}

/// Governs whether an already-cached local copy is fresh enough to skip
/// a remote check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "lowercase")]
pub enum UpdateSetting {
    /// Re-check the remote on every request.
    Always,
    /// Check at most once per calendar day.
    Daily,
    /// Check once the last check is older than `minutes`.
    Interval { minutes: u32 },
    /// Once present locally, never check again.
    Never,
}

/// Whether a connector-level transport error aborts the whole request or
/// lets resolution continue with the next connector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorSetting {
    Stop,
    Continue,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PolicySettings {
    pub checksum: ChecksumSetting,
    pub releases: UpdateSetting,
    pub snapshots: UpdateSetting,
    pub cache_failures: bool,
    pub on_error: ErrorSetting,
}

impl Default for PolicySettings {
    fn default() -> Self {
        Self {
            checksum: ChecksumSetting::Warn,
            releases: UpdateSetting::Daily,
            snapshots: UpdateSetting::Daily,
            cache_failures: true,
            on_error: ErrorSetting::Stop,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_setting_serde_identifiers() {
        let s: UpdateSetting = serde_json::from_str(r#"{"policy":"interval","minutes":30}"#).unwrap();
        assert_eq!(s, UpdateSetting::Interval { minutes: 30 });
        let s: UpdateSetting = serde_json::from_str(r#"{"policy":"never"}"#).unwrap();
        assert_eq!(s, UpdateSetting::Never);
    }

    #[test]
    fn policy_settings_defaults_fill_in() {
        let s: PolicySettings = serde_json::from_str(r#"{"checksum":"fail"}"#).unwrap();
        assert_eq!(s.checksum, ChecksumSetting::Fail);
        assert_eq!(s.releases, UpdateSetting::Daily);
        assert!(s.cache_failures);
        assert_eq!(s.on_error, ErrorSetting::Stop);
    }
}
