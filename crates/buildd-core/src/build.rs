//! Build outcomes and the verdicts reported to wanna-build

use std::fmt;

/// Exit code sbuild uses for a build that failed for a known reason.
pub const SBUILD_ATTEMPTED_EXIT_CODE: i32 = 2;

/// Classified result of a single sbuild run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildOutcome {
    /// The package built; the changes file is ready for upload
    Built,

    /// The build failed in a way another attempt will not fix
    Attempted,

    /// The build ended abnormally; hand the job back to the pool
    GiveBack,
}

/// Status update sent to the queue for a job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Built,
    Attempted,
    GiveBack,
    Uploaded,
}

impl BuildOutcome {
    /// Classify an sbuild exit status.
    ///
    /// `None` means the process was terminated by a signal.
    pub fn from_exit_code(code: Option<i32>) -> Self {
        match code {
            Some(0) => Self::Built,
            Some(SBUILD_ATTEMPTED_EXIT_CODE) => Self::Attempted,
            _ => Self::GiveBack,
        }
    }

    /// The verdict reported to the queue for this outcome
    pub fn verdict(&self) -> Verdict {
        match self {
            Self::Built => Verdict::Built,
            Self::Attempted => Verdict::Attempted,
            Self::GiveBack => Verdict::GiveBack,
        }
    }

    /// Whether the build produced an artifact worth uploading
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Built)
    }
}

impl Verdict {
    /// Wire name understood by wanna-build
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Built => "built",
            Self::Attempted => "attempted",
            Self::GiveBack => "give-back",
            Self::Uploaded => "uploaded",
        }
    }

    /// Command line flag selecting this verdict
    pub fn flag(&self) -> String {
        format!("--{}", self.as_str())
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
