//! Build metadata emitted by `build.rs`.
//!
//! Identifies which leafcheck binary produced a result: crate version, git
//! revision, target and whether the local ONNX backend was compiled in.

use std::fmt;

/// Package version from Cargo.toml.
pub const PKG_VERSION: &str = env!("CARGO_PKG_VERSION");

const UNKNOWN: &str = "unknown";

/// Build-time facts about this binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildInfo {
    pub version: &'static str,
    pub git_branch: &'static str,
    pub git_sha: &'static str,
    pub git_dirty: bool,
    pub built_at: &'static str,
    pub target: &'static str,
    /// Whether the `onnx` classifier backend is available.
    pub onnx: bool,
}

impl BuildInfo {
    /// Short commit id (first 7 characters).
    pub fn short_sha(&self) -> &'static str {
        self.git_sha.get(..7).unwrap_or(self.git_sha)
    }

    /// Multi-line description for `--version`.
    pub fn long_version(&self) -> String {
        format!(
            "{self}\nbuilt:   {}\ntarget:  {}\nbackend: {}",
            self.built_at,
            self.target,
            if self.onnx { "onnx" } else { "none" },
        )
    }
}

/// `{version}+{branch}.{sha}`, with `.dirty` appended for dirty trees.
impl fmt::Display for BuildInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}+{}.{}", self.version, self.git_branch, self.short_sha())?;
        if self.git_dirty {
            f.write_str(".dirty")?;
        }
        Ok(())
    }
}

/// Whether the working tree was dirty at build time.
pub fn git_dirty() -> bool {
    option_env!("VERGEN_GIT_DIRTY") == Some("true")
}

/// Metadata of the running binary.
pub fn build_info() -> BuildInfo {
    BuildInfo {
        version: PKG_VERSION,
        git_branch: or_unknown(option_env!("VERGEN_GIT_BRANCH")),
        git_sha: or_unknown(option_env!("VERGEN_GIT_SHA")),
        git_dirty: git_dirty(),
        built_at: or_unknown(option_env!("VERGEN_BUILD_TIMESTAMP")),
        target: or_unknown(option_env!("VERGEN_CARGO_TARGET_TRIPLE")),
        onnx: cfg!(feature = "onnx"),
    }
}

fn or_unknown(value: Option<&'static str>) -> &'static str {
    value.unwrap_or(UNKNOWN)
}

/// One-line version string, e.g. `0.1.0+main.abc1234`.
pub fn version_string() -> String {
    build_info().to_string()
}
