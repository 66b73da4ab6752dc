use serde::{Deserialize, Serialize};

/// Normalized artifact coordinate. Immutable once parsed; the
/// layout-resolved relative path string is the lookup key everywhere else.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactRef {
    pub group_id: String,
    pub artifact_id: String,
    pub version: String,
    pub classifier: Option<String>,
    pub extension: String,
}

impl ArtifactRef {
    pub fn is_snapshot(&self) -> bool {
        self.version.ends_with("-SNAPSHOT")
    }
}

impl std::fmt::Display for ArtifactRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.group_id, self.artifact_id, self.version)?;
        if let Some(cls) = &self.classifier {
            write!(f, ":{cls}")?;
        }
        write!(f, ":{}", self.extension)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_detection() {
        let mut a = ArtifactRef {
            group_id: "org.example".into(),
            artifact_id: "widget".into(),
            version: "1.0".into(),
            classifier: None,
            extension: "jar".into(),
        };
        assert!(!a.is_snapshot());
        a.version = "1.1-SNAPSHOT".into();
        assert!(a.is_snapshot());
    }

    #[test]
    fn display_includes_classifier() {
        let a = ArtifactRef {
            group_id: "org.example".into(),
            artifact_id: "widget".into(),
            version: "2.0".into(),
            classifier: Some("sources".into()),
            extension: "jar".into(),
        };
        assert_eq!(a.to_string(), "org.example:widget:2.0:sources:jar");
    }
}
