//! Timeline scope: which feed a command targets.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TimelineScope {
    /// Not applicable / not set.
    #[default]
    Unknown,
    Home,
    Mentions,
    Direct,
    Favorites,
    User,
    Public,
    Followers,
    Following,
    All,
}

impl TimelineScope {
    pub fn as_str(self) -> &'static str {
        match self {
            TimelineScope::Unknown => "unknown",
            TimelineScope::Home => "home",
            TimelineScope::Mentions => "mentions",
            TimelineScope::Direct => "direct",
            TimelineScope::Favorites => "favorites",
            TimelineScope::User => "user",
            TimelineScope::Public => "public",
            TimelineScope::Followers => "followers",
            TimelineScope::Following => "following",
            TimelineScope::All => "all",
        }
    }

    /// Unrecognized scopes fall back to `Unknown`; this is not a decode failure.
    pub fn from_wire(s: &str) -> Self {
        match s {
            "home" => TimelineScope::Home,
            "mentions" => TimelineScope::Mentions,
            "direct" => TimelineScope::Direct,
            "favorites" => TimelineScope::Favorites,
            "user" => TimelineScope::User,
            "public" => TimelineScope::Public,
            "followers" => TimelineScope::Followers,
            "following" => TimelineScope::Following,
            "all" => TimelineScope::All,
            _ => TimelineScope::Unknown,
        }
    }

    pub fn is_unknown(self) -> bool {
        self == TimelineScope::Unknown
    }
}

impl fmt::Display for TimelineScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scope_from_wire() {
        assert_eq!(TimelineScope::from_wire("mentions"), TimelineScope::Mentions);
        assert_eq!(TimelineScope::from_wire("public"), TimelineScope::Public);
        assert_eq!(TimelineScope::from_wire("nonsense"), TimelineScope::Unknown);
        assert_eq!(TimelineScope::default(), TimelineScope::Unknown);
    }
}
