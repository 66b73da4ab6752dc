pub struct RepoPath;

impl RepoPath {
    /// Standardize directory separators to forward slashes and strip any
    /// leading slash. This is the wire format for connector filters and
    /// managed-storage keys.
    pub fn normalize(path: &str) -> String {
        let p = path.replace('\\', "/");
        p.trim_start_matches('/').to_string()
    }

    /// Reject paths that could escape the managed repository root when
    /// joined onto it. Requests come from the outside world.
    pub fn verify_safe(rel_path: &str) -> bool {
        let p = std::path::Path::new(rel_path);
        !p.is_absolute()
            && !p
                .components()
                .any(|c| matches!(c, std::path::Component::ParentDir))
    }

    /// Split a checksum companion request (`foo.jar.sha1`) into the base
    /// artifact path and the digest extension.
    pub fn split_companion(path: &str) -> (&str, Option<&'static str>) {
        for ext in ["sha1", "md5"] {
            if let Some(base) = path
                .strip_suffix(ext)
                .and_then(|p| p.strip_suffix('.'))
            {
                return (base, Some(ext));
            }
        }
        (path, None)
    }
}
