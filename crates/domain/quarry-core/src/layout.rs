use crate::artifact::ArtifactRef;
use crate::path_utils::RepoPath;

#[derive(Debug, thiserror::Error)]
pub enum LayoutError {
    #[error("path has too few segments to be an artifact: {0}")]
    TooShort(String),
    #[error("filename {filename} does not belong to artifact {artifact_id} in {path}")]
    FilenameMismatch {
        path: String,
        artifact_id: String,
        filename: String,
    },
    #[error("filename has no extension: {0}")]
    MissingExtension(String),
}

/// Resolves artifact coordinates to relative repository paths and back.
/// Only the subset the proxy needs; full layout rules live with the
/// scanning/indexing consumers.
pub trait RepositoryLayout: Send + Sync {
    fn path_of(&self, artifact: &ArtifactRef) -> String;
    fn parse(&self, path: &str) -> Result<ArtifactRef, LayoutError>;
}

/// Standard Maven 2 directory layout:
/// `group/with/slashes/artifactId/version/artifactId-version[-classifier].ext`
#[derive(Debug, Clone, Copy, Default)]
pub struct Maven2Layout;

impl RepositoryLayout for Maven2Layout {
    fn path_of(&self, artifact: &ArtifactRef) -> String {
        let mut name = format!("{}-{}", artifact.artifact_id, artifact.version);
        if let Some(cls) = &artifact.classifier {
            name.push('-');
            name.push_str(cls);
        }
        name.push('.');
        name.push_str(&artifact.extension);
        format!(
            "{}/{}/{}/{}",
            artifact.group_id.replace('.', "/"),
            artifact.artifact_id,
            artifact.version,
            name
        )
    }

    fn parse(&self, path: &str) -> Result<ArtifactRef, LayoutError> {
        let normalized = RepoPath::normalize(path);
        let segments: Vec<&str> = normalized.split('/').filter(|s| !s.is_empty()).collect();
        if segments.len() < 4 {
            return Err(LayoutError::TooShort(normalized.clone()));
        }

        let filename = segments[segments.len() - 1];
        let version = segments[segments.len() - 2];
        let artifact_id = segments[segments.len() - 3];
        let group_id = segments[..segments.len() - 3].join(".");

        let rest = filename.strip_prefix(artifact_id).and_then(|r| r.strip_prefix('-')).ok_or_else(
            || LayoutError::FilenameMismatch {
                path: normalized.clone(),
                artifact_id: artifact_id.to_string(),
                filename: filename.to_string(),
            },
        )?;

        let (stem, extension) = rest
            .rsplit_once('.')
            .ok_or_else(|| LayoutError::MissingExtension(filename.to_string()))?;

        // Timestamped snapshot filenames carry a resolved version that
        // differs from the version directory; keep the directory version so
        // snapshot policies see the SNAPSHOT coordinate.
        let classifier = if stem == version {
            None
        } else if let Some(cls) = stem.strip_prefix(version).and_then(|r| r.strip_prefix('-')) {
            Some(cls.to_string())
        } else {
            None
        };

        Ok(ArtifactRef {
            group_id,
            artifact_id: artifact_id.to_string(),
            version: version.to_string(),
            classifier,
            extension: extension.to_string(),
        })
    }
}
