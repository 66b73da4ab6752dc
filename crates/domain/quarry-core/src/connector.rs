use crate::policy::PolicySettings;
use glob::{MatchOptions, Pattern};
use serde::{Deserialize, Serialize};

/// Binds one managed repository to one remote repository, with the path
/// filters and policies governing fetches through that binding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryConnector {
    pub managed_id: String,
    pub remote_id: String,
    /// Ascending try order. `0` means "unordered" and sorts after every
    /// positive value.
    #[serde(default)]
    pub order: u32,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Globs never fetched through this connector.
    #[serde(default)]
    pub blacklist: Vec<String>,
    /// Globs fetched even when a blacklist pattern matches.
    #[serde(default)]
    pub whitelist: Vec<String>,
    #[serde(default)]
    pub policies: PolicySettings,
}

fn default_enabled() -> bool {
    true
}

fn glob_match_options() -> MatchOptions {
    // `*` must not cross directory boundaries; `**` spans them.
    MatchOptions {
        case_sensitive: true,
        require_literal_separator: true,
        require_literal_leading_dot: false,
    }
}

fn any_pattern_matches(patterns: &[String], path: &str) -> bool {
    let opts = glob_match_options();
    patterns.iter().any(|p| {
        Pattern::new(p)
            .map(|pat| pat.matches_with(path, opts))
            .unwrap_or(false)
    })
}

impl RepositoryConnector {
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// A path is blocked when it matches the blacklist and is not rescued
    /// by the whitelist.
    pub fn is_path_blocked(&self, path: &str) -> bool {
        any_pattern_matches(&self.blacklist, path) && !any_pattern_matches(&self.whitelist, path)
    }
}

/// Connectors in try order: ascending `order`, with `order == 0` last.
/// The sort is stable, so equal orders keep their configuration order
/// for the life of the process.
pub fn sorted_connectors<'a, I>(connectors: I) -> Vec<&'a RepositoryConnector>
where
    I: IntoIterator<Item = &'a RepositoryConnector>,
{
    let mut out: Vec<&RepositoryConnector> = connectors.into_iter().collect();
    out.sort_by_key(|c| (c.order == 0, c.order));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn connector(order: u32) -> RepositoryConnector {
        RepositoryConnector {
            managed_id: "internal".into(),
            remote_id: format!("remote-{order}"),
            order,
            enabled: true,
            blacklist: Vec::new(),
            whitelist: Vec::new(),
            policies: PolicySettings::default(),
        }
    }

    #[test]
    fn zero_order_sorts_last() {
        let connectors = vec![connector(3), connector(0), connector(1)];
        let sorted = sorted_connectors(&connectors);
        let orders: Vec<u32> = sorted.iter().map(|c| c.order).collect();
        assert_eq!(orders, vec![1, 3, 0]);
    }

    #[test]
    fn equal_orders_keep_configuration_order() {
        let mut a = connector(2);
        a.remote_id = "first".into();
        let mut b = connector(2);
        b.remote_id = "second".into();
        let connectors = vec![a, b];
        let sorted = sorted_connectors(&connectors);
        assert_eq!(sorted[0].remote_id, "first");
        assert_eq!(sorted[1].remote_id, "second");
    }

    #[test]
    fn whitelist_rescues_blacklisted_path() {
        let mut c = connector(1);
        c.blacklist = vec!["**/*.pom".into()];
        c.whitelist = vec!["specific/path/file.pom".into()];
        assert!(c.is_path_blocked("other/path/file.pom"));
        assert!(!c.is_path_blocked("specific/path/file.pom"));
        assert!(!c.is_path_blocked("any/path/file.jar"));
    }

    #[test]
    fn invalid_pattern_never_matches() {
        let mut c = connector(1);
        c.blacklist = vec!["[".into()];
        assert!(!c.is_path_blocked("anything"));
    }
}
