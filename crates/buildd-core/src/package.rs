//! Package jobs taken from the wanna-build queue

use std::collections::HashMap;
use std::fmt;

use crate::error::{Error, Result};
use crate::version::{binnmu_version, split_package_version, strip_epoch};

/// Semantic field of a take response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobField {
    PackageVersion,
    Distribution,
    Architecture,
    Archive,
    BuildDepResolver,
    MailLogs,
    BinNmu,
    BinNmuChangelog,
    ExtraDepends,
    ExtraConflicts,
}

/// Maps one field of the take response onto the job
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    /// Key as it appears in the wanna-build response
    pub source: &'static str,
    pub field: JobField,
    pub required: bool,
}

/// Fields read from a take response. Anything not listed is ignored.
pub const TAKE_SCHEMA: &[FieldSpec] = &[
    FieldSpec { source: "pkg-ver", field: JobField::PackageVersion, required: true },
    FieldSpec { source: "suite", field: JobField::Distribution, required: true },
    FieldSpec { source: "arch", field: JobField::Architecture, required: true },
    FieldSpec { source: "archive", field: JobField::Archive, required: true },
    FieldSpec { source: "build_dep_resolver", field: JobField::BuildDepResolver, required: false },
    FieldSpec { source: "mail_logs", field: JobField::MailLogs, required: false },
    FieldSpec { source: "binNMU", field: JobField::BinNmu, required: false },
    FieldSpec { source: "extra-changelog", field: JobField::BinNmuChangelog, required: false },
    FieldSpec { source: "extra-depends", field: JobField::ExtraDepends, required: false },
    FieldSpec { source: "extra-conflicts", field: JobField::ExtraConflicts, required: false },
];

/// A unit of work taken from the queue.
///
/// Every derived identifier is computed in [`PackageJob::from_fields`] and
/// never changes afterwards. Reports to the queue use the binary version;
/// file names and working directories use the epochless versions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageJob {
    name: String,
    source_package: String,
    source_version: String,
    epochless_source_version: String,
    architecture: String,
    distribution: String,
    archive: String,
    build_dep_resolver: Option<String>,
    mail_logs: Option<String>,
    binnmu: Option<u32>,
    binnmu_changelog: Option<String>,
    extra_depends: Option<String>,
    extra_conflicts: Option<String>,
    binary_version: String,
    epochless_binary_version: String,
    changes_file: String,
}

impl PackageJob {
    /// Build a job from the flattened take response of package `name`.
    pub fn from_fields(name: impl Into<String>, fields: &HashMap<String, String>) -> Result<Self> {
        let mut values: HashMap<JobField, String> = HashMap::new();
        for spec in TAKE_SCHEMA {
            match fields.get(spec.source).filter(|value| !value.is_empty()) {
                Some(value) => {
                    values.insert(spec.field, value.clone());
                }
                None if spec.required => {
                    return Err(Error::invalid_take_response(format!(
                        "missing required field '{}'",
                        spec.source
                    )));
                }
                None => {}
            }
        }

        let mut take = |field: JobField| values.remove(&field);
        // Required fields are guaranteed present by the loop above.
        let pkg_ver = take(JobField::PackageVersion).unwrap_or_default();
        let distribution = take(JobField::Distribution).unwrap_or_default();
        let architecture = take(JobField::Architecture).unwrap_or_default();
        let archive = take(JobField::Archive).unwrap_or_default();

        let binnmu = take(JobField::BinNmu)
            .map(|raw| {
                raw.trim().parse::<u32>().map_err(|_| {
                    Error::invalid_take_response(format!("binNMU is not a number: {raw}"))
                })
            })
            .transpose()?
            .filter(|n| *n > 0);

        let (source_package, source_version) = split_package_version(&pkg_ver)?;
        let epochless_source_version = strip_epoch(source_version)?.to_string();
        let binary_version = binnmu_version(source_version, binnmu);
        let epochless_binary_version = binnmu_version(&epochless_source_version, binnmu);
        let changes_file =
            format!("{source_package}_{epochless_binary_version}_{architecture}.changes");

        Ok(Self {
            name: name.into(),
            source_package: source_package.to_string(),
            source_version: source_version.to_string(),
            epochless_source_version,
            build_dep_resolver: take(JobField::BuildDepResolver),
            mail_logs: take(JobField::MailLogs),
            binnmu,
            binnmu_changelog: take(JobField::BinNmuChangelog),
            extra_depends: take(JobField::ExtraDepends),
            extra_conflicts: take(JobField::ExtraConflicts),
            architecture,
            distribution,
            archive,
            binary_version,
            epochless_binary_version,
            changes_file,
        })
    }

    /// Package name that keyed the take response
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source_package(&self) -> &str {
        &self.source_package
    }

    /// Source version, including the epoch if there is one
    pub fn source_version(&self) -> &str {
        &self.source_version
    }

    pub fn epochless_source_version(&self) -> &str {
        &self.epochless_source_version
    }

    pub fn architecture(&self) -> &str {
        &self.architecture
    }

    pub fn distribution(&self) -> &str {
        &self.distribution
    }

    /// Archive the result is uploaded to (`debian`, `debian-security`, ...)
    pub fn archive(&self) -> &str {
        &self.archive
    }

    pub fn build_dep_resolver(&self) -> Option<&str> {
        self.build_dep_resolver.as_deref()
    }

    pub fn mail_logs(&self) -> Option<&str> {
        self.mail_logs.as_deref()
    }

    /// binNMU counter, only set for binary-only rebuilds
    pub fn binnmu(&self) -> Option<u32> {
        self.binnmu
    }

    pub fn binnmu_changelog(&self) -> Option<&str> {
        self.binnmu_changelog.as_deref()
    }

    pub fn extra_depends(&self) -> Option<&str> {
        self.extra_depends.as_deref()
    }

    pub fn extra_conflicts(&self) -> Option<&str> {
        self.extra_conflicts.as_deref()
    }

    pub fn binary_version(&self) -> &str {
        &self.binary_version
    }

    pub fn epochless_binary_version(&self) -> &str {
        &self.epochless_binary_version
    }

    /// Name of the changes file sbuild leaves in the working directory
    pub fn changes_file(&self) -> &str {
        &self.changes_file
    }

    /// `<package>_<source version>`, the argument handed to sbuild
    pub fn source_package_version(&self) -> String {
        format!("{}_{}", self.source_package, self.source_version)
    }

    /// `<package>_<binary version>`, the identifier reported to the queue
    pub fn source_package_binary_version(&self) -> String {
        format!("{}_{}", self.source_package, self.binary_version)
    }

    /// Directory name of the per-job working directory
    pub fn work_dir_name(&self) -> String {
        format!("{}_{}", self.source_package, self.epochless_source_version)
    }
}

impl fmt::Display for PackageJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.source_package, self.binary_version)
    }
}
