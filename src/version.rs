// Version and build information

/// Build information embedded by build.rs
#[derive(Debug, Clone)]
pub struct BuildInfo {
    pub version: String,
    pub build_date: String,
    pub build_hash: String,
    pub git_clean: String,
    pub target_triple: String,
    /// Cargo profile the binary was built with (`debug`, `release`, ...)
    pub profile: String,
}

/// Crate version
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// Get current build information
pub fn build_info() -> BuildInfo {
    BuildInfo {
        version: version().to_string(),
        build_date: option_env!("BUILD_DATE").unwrap_or("unknown").to_string(),
        build_hash: option_env!("GIT_HASH").unwrap_or("unknown").to_string(),
        git_clean: option_env!("GIT_CLEAN").unwrap_or("unknown").to_string(),
        target_triple: option_env!("BUILD_TARGET").unwrap_or("unknown").to_string(),
        profile: option_env!("BUILD_PROFILE")
            .unwrap_or(if cfg!(debug_assertions) { "debug" } else { "release" })
            .to_string(),
    }
}

impl BuildInfo {
    /// One-line version string, e.g. `hostswitch v0.1.0`
    pub fn format_display(&self) -> String {
        format!("hostswitch v{}", self.version)
    }

    /// Version plus commit, used in the startup log line
    pub fn format_detailed(&self) -> String {
        let mut result = self.format_display();

        if self.build_hash != "unknown" {
            result.push_str(&format!(" (commit {})", self.build_hash));
        }
        if self.git_clean == "false" {
            result.push_str(" [dirty]");
        }

        result
    }

    pub fn format_build_info(&self) -> String {
        format!(
            "Build: {}\nTarget: {}\nProfile: {}\nGit: {}\nClean: {}",
            self.build_date,
            self.target_triple,
            self.profile,
            self.build_hash,
            self.git_clean,
        )
    }
}
