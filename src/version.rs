//! Build identification for `epctl --version` and the HTTP user agent.
//!
//! Git fields are embedded by `build.rs` through vergen and fall back to
//! `"unknown"` when the crate is built outside a git checkout.

use std::fmt;

/// Package version from Cargo.toml.
pub const PKG_VERSION: &str = env!("CARGO_PKG_VERSION");

const GIT_BRANCH: &str = match option_env!("VERGEN_GIT_BRANCH") {
    Some(branch) => branch,
    None => "unknown",
};

const GIT_SHA: &str = match option_env!("VERGEN_GIT_SHA") {
    Some(sha) => sha,
    None => "unknown",
};

/// What this binary was built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildInfo {
    pub version: &'static str,
    pub branch: &'static str,
    pub sha: &'static str,
    pub dirty: bool,
}

impl BuildInfo {
    /// Metadata embedded at compile time.
    pub fn current() -> Self {
        Self {
            version: PKG_VERSION,
            branch: GIT_BRANCH,
            sha: GIT_SHA,
            dirty: option_env!("VERGEN_GIT_DIRTY") == Some("true"),
        }
    }

    /// Commit SHA cut to seven characters.
    pub fn short_sha(&self) -> &str {
        self.sha.get(..7).unwrap_or(self.sha)
    }

    /// `User-Agent` header value sent to the API.
    pub fn user_agent(&self) -> String {
        format!("europarl-gateway/{} (+{})", self.version, self.short_sha())
    }
}

/// `{version}+{branch}.{sha}`, with `.dirty` appended for a modified tree.
impl fmt::Display for BuildInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}+{}.{}", self.version, self.branch, self.short_sha())?;
        if self.dirty {
            f.write_str(".dirty")?;
        }
        Ok(())
    }
}

/// Full version string of the running build, e.g. `0.1.0+main.3f9c2d1`.
pub fn version_string() -> String {
    BuildInfo::current().to_string()
}

/// User agent of the running build.
pub fn user_agent() -> String {
    BuildInfo::current().user_agent()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(sha: &'static str, dirty: bool) -> BuildInfo {
        BuildInfo {
            version: "0.3.1",
            branch: "main",
            sha,
            dirty,
        }
    }

    #[test]
    fn display_shortens_sha_and_marks_dirty_trees() {
        assert_eq!(build("3f9c2d1e8a", false).to_string(), "0.3.1+main.3f9c2d1");
        assert_eq!(build("3f9c2d1e8a", true).to_string(), "0.3.1+main.3f9c2d1.dirty");
    }

    #[test]
    fn unknown_sha_is_kept_whole() {
        assert_eq!(build("unknown", false).short_sha(), "unknown");
    }

    #[test]
    fn user_agent_names_crate_version_and_commit() {
        assert_eq!(
            build("3f9c2d1e8a", true).user_agent(),
            "europarl-gateway/0.3.1 (+3f9c2d1)"
        );
        assert!(user_agent().starts_with(&format!("europarl-gateway/{PKG_VERSION} (+")));
    }

    #[test]
    fn running_build_uses_package_version() {
        assert!(version_string().starts_with(PKG_VERSION));
    }
}
