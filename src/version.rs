/// Semantic version number being executed
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Pre-release marker. Empty for a final release, otherwise "dev", "beta",
/// "rc1" and so on.
pub const VERSION_PRERELEASE: &str = "alpha";

/// Git commit the binary was built from, set by the release build through
/// `DISSEMBLER_GIT_COMMIT`
pub const GIT_COMMIT: Option<&str> = option_env!("DISSEMBLER_GIT_COMMIT");

/// Output of `git describe` at build time, set through `DISSEMBLER_GIT_DESCRIBE`
pub const GIT_DESCRIBE: Option<&str> = option_env!("DISSEMBLER_GIT_DESCRIBE");

/// Version string for humans, e.g. `1.0.0-alpha (3f2c1e9)`
#[must_use]
pub fn human_version() -> String {
    let mut version = if VERSION_PRERELEASE.is_empty() {
        VERSION.to_string()
    } else {
        format!("{VERSION}-{VERSION_PRERELEASE}")
    };

    if let Some(describe) = GIT_DESCRIBE.filter(|d| !d.is_empty()) {
        version.push_str(&format!(" ({describe})"));
    } else if let Some(commit) = GIT_COMMIT.filter(|c| !c.is_empty()) {
        let short = commit.get(..7).unwrap_or(commit);
        version.push_str(&format!(" ({short})"));
    }

    version
}
