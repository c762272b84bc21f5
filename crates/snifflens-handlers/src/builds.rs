//! Release catalogue for the supported client line.

use snifflens_core::{BuildCatalog, BuildId};

pub const V19033: BuildId = BuildId(19033);
pub const V19103: BuildId = BuildId(19103);
pub const V19678: BuildId = BuildId(19678);
pub const V19700: BuildId = BuildId(19700);

const RELEASES: [(&str, BuildId); 4] = [
    ("6.0.2.19033", V19033),
    ("6.0.3.19103", V19103),
    ("6.1.0.19678", V19678),
    ("6.2.0.19700", V19700),
];

/// Maps release strings from capture headers to build ordinals.
///
/// # Examples
/// ```
/// use snifflens_core::BuildCatalog;
/// use snifflens_handlers::KnownBuilds;
///
/// assert!(KnownBuilds.resolve("6.0.3.19103").is_some());
/// assert!(KnownBuilds.resolve("9.9.9.99999").is_none());
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct KnownBuilds;

impl BuildCatalog for KnownBuilds {
    fn resolve(&self, version: &str) -> Option<BuildId> {
        RELEASES
            .iter()
            .find(|(release, _)| *release == version)
            .map(|&(_, build)| build)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn releases_are_ordered_by_build() {
        for pair in RELEASES.windows(2) {
            assert!(pair[0].1 < pair[1].1);
        }
    }

    #[test]
    fn resolve_is_exact_match_only() {
        assert_eq!(KnownBuilds.resolve("6.0.2.19033"), Some(V19033));
        assert_eq!(KnownBuilds.resolve("6.0.2"), None);
    }
}
