//! Debian version handling for epochs and binNMU suffixes

use std::sync::OnceLock;

use regex::Regex;

use crate::error::{Error, Result};

fn epoch_regex() -> &'static Regex {
    static EPOCH: OnceLock<Regex> = OnceLock::new();
    EPOCH.get_or_init(|| Regex::new(r"^(\d+):(.+)$").expect("Valid regex"))
}

/// Split a `<package>_<version>` pair as handed out by wanna-build.
pub fn split_package_version(pkg_ver: &str) -> Result<(&str, &str)> {
    match pkg_ver.split_once('_') {
        Some((package, version)) if !package.is_empty() && !version.is_empty() => {
            Ok((package, version))
        }
        _ => Err(Error::invalid_version(pkg_ver, "Expected <package>_<version>")),
    }
}

/// Return the version with its `N:` epoch removed, if it has one.
pub fn strip_epoch(version: &str) -> Result<&str> {
    if !version.contains(':') {
        return Ok(version);
    }

    epoch_regex()
        .captures(version)
        .and_then(|captures| captures.get(2))
        .map(|upstream| upstream.as_str())
        .ok_or_else(|| Error::invalid_version(version, "Epoch must be numeric"))
}

/// Append the `+bN` suffix of a binary-only rebuild.
pub fn binnmu_version(version: &str, binnmu: Option<u32>) -> String {
    match binnmu {
        Some(n) if n > 0 => format!("{version}+b{n}"),
        _ => version.to_string(),
    }
}
