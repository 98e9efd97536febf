//! Parsing of wanna-build responses

use std::collections::HashMap;

use buildd_core::PackageJob;
use serde_yaml::Value;
use tracing::{debug, info};

use crate::error::{QueueError, Result};

/// Status value of a successful take
pub const TAKE_STATUS_OK: &str = "ok";

/// A pending job as named by `--list=needs-build`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobIdentifier {
    pub architecture: String,
    pub distribution: String,
    /// `<package>_<version>`
    pub package_version: String,
}

impl JobIdentifier {
    /// Parse `arch/dist/package_version`
    pub fn parse(identifier: &str) -> Result<Self> {
        let mut parts = identifier.splitn(3, '/');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(arch), Some(dist), Some(pkgver))
                if !arch.is_empty() && !dist.is_empty() && !pkgver.is_empty() =>
            {
                Ok(Self {
                    architecture: arch.to_string(),
                    distribution: dist.to_string(),
                    package_version: pkgver.to_string(),
                })
            }
            _ => Err(QueueError::invalid_identifier(identifier)),
        }
    }
}

/// Extract job identifiers from a pending list, in queue order.
///
/// Each line looks like `amd64/sid/chasquid_0.04-1 [optional:out-of-date:...]`;
/// only the first token is kept.
pub fn parse_pending(response: &str) -> Vec<String> {
    response
        .lines()
        .filter_map(|line| line.split_whitespace().next())
        .map(str::to_string)
        .collect()
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Flatten the take response into the package name and its fields.
///
/// The response is a list holding one mapping from the package name to a list
/// of single-entry mappings, e.g.
///
/// ```yaml
/// - chasquid:
///     - status: ok
///     - pkg-ver: chasquid_0.04-1
/// ```
pub fn flatten_take_response(response: &str) -> Result<(String, HashMap<String, String>)> {
    let document: Value = serde_yaml::from_str(response)?;

    let entry = document
        .as_sequence()
        .and_then(|entries| entries.first())
        .and_then(Value::as_mapping)
        .ok_or_else(|| QueueError::invalid_response("take response is not a list of packages"))?;

    let (name, descriptor) = entry
        .iter()
        .next()
        .ok_or_else(|| QueueError::invalid_response("take response names no package"))?;

    let name = scalar_to_string(name)
        .ok_or_else(|| QueueError::invalid_response("package name is not a scalar"))?;

    let items = descriptor.as_sequence().ok_or_else(|| {
        QueueError::invalid_response(format!("fields of {name} are not a list"))
    })?;

    let mut fields = HashMap::new();
    for item in items {
        let Some(mapping) = item.as_mapping() else {
            debug!("Ignoring non-mapping entry in take response for {}", name);
            continue;
        };
        for (key, value) in mapping {
            match (scalar_to_string(key), scalar_to_string(value)) {
                (Some(key), Some(value)) => {
                    fields.insert(key, value);
                }
                (Some(key), None) => debug!("Ignoring non-scalar field {} for {}", key, name),
                _ => {}
            }
        }
    }

    Ok((name, fields))
}

/// Turn a take response into a job, or `None` when the take was lost.
pub fn parse_take_response(response: &str) -> Result<Option<PackageJob>> {
    let (name, fields) = flatten_take_response(response)?;

    let status = fields
        .get("status")
        .ok_or_else(|| QueueError::invalid_response(format!("no status for {name}")))?;

    if status != TAKE_STATUS_OK {
        info!(
            "Could not take {}: {} ({})",
            name,
            status,
            fields.get("reason").map(String::as_str).unwrap_or("no reason given")
        );
        return Ok(None);
    }

    Ok(Some(PackageJob::from_fields(name, &fields)?))
}
