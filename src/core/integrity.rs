//! Staging-area integrity: a digest taken before and after every run.

use sha2::{Digest, Sha256};
use std::fmt;
use tracing::{debug, error, warn};

use crate::core::error::{GovernanceError, Result};
use crate::core::git::StagingAreaProbe;

/// SHA-256 (hex) of the staged file list and the staged diff.
///
/// An empty digest means the staging area could not be queried.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StagingDigest(String);

impl StagingDigest {
    pub fn unavailable() -> Self {
        Self::default()
    }

    pub fn of(files: &[String], diff: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(files.join("\n").as_bytes());
        hasher.update(b"\n---\n");
        hasher.update(diff.as_bytes());
        Self(hex::encode(hasher.finalize()))
    }

    pub fn is_unavailable(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StagingDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            write!(f, "<unavailable>")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

/// Digests the current staging area. Never fails: a probe error degrades to
/// the empty digest, which only ever matches another empty digest.
pub fn capture_state(probe: &dyn StagingAreaProbe) -> StagingDigest {
    let state = probe
        .staged_files()
        .and_then(|files| probe.staged_diff().map(|diff| (files, diff)));

    match state {
        Ok((files, diff)) => {
            let digest = StagingDigest::of(&files, &diff);
            debug!(digest = %digest, files = files.len(), "Captured staging area state");
            digest
        }
        Err(e) => {
            warn!(error = %e, "Staging area unavailable, integrity check degraded");
            StagingDigest::unavailable()
        }
    }
}

/// Fails with `StagingAreaModified` when the two digests differ.
pub fn verify_unchanged(before: &StagingDigest, after: &StagingDigest) -> Result<()> {
    if before == after {
        return Ok(());
    }
    error!(before = %before, after = %after, "Staging area modified during validation");
    Err(GovernanceError::StagingAreaModified {
        before: before.to_string(),
        after: after.to_string(),
    })
}
