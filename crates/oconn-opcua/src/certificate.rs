// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Certificate handling.
//!
//! Validation is permissive by policy: the client trusts every server
//! certificate and its own certificate is self-generated on first run by
//! the library. What this module owns is the PKI directory layout and the
//! once-per-subject acceptance log, so a fleet rollout still leaves an
//! audit trail of what was trusted.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashSet;
use std::hash::{Hash, Hasher};
use std::io;
use std::path::Path;

use parking_lot::Mutex;
use tracing::{debug, info};

/// The PKI subdirectories created on startup.
pub const PKI_SUBDIRS: [&str; 3] = ["own", "trusted", "rejected"];

/// Creates the PKI directory tree if missing.
pub fn prepare_pki(base: &Path) -> io::Result<()> {
    for sub in PKI_SUBDIRS {
        std::fs::create_dir_all(base.join(sub))?;
    }
    debug!(base = %base.display(), "PKI directories ready");
    Ok(())
}

/// Logs each accepted server certificate once, keyed by a fingerprint of
/// its DER bytes.
#[derive(Debug, Default)]
pub struct SubjectLog {
    seen: Mutex<HashSet<u64>>,
}

impl SubjectLog {
    /// Creates an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Notes a server certificate; the first sighting of each distinct
    /// certificate is logged at info.
    pub fn note(&self, der: Option<&[u8]>) {
        let Some(der) = der else {
            return;
        };
        if der.is_empty() {
            return;
        }

        let fingerprint = fingerprint(der);
        let mut seen = self.seen.lock();
        if seen.insert(fingerprint) {
            info!(
                fingerprint = format_args!("{:016x}", fingerprint),
                bytes = der.len(),
                "Accepting server certificate (validation is permissive)"
            );
        }
    }

    /// Number of distinct certificates noted.
    pub fn distinct(&self) -> usize {
        self.seen.lock().len()
    }
}

fn fingerprint(der: &[u8]) -> u64 {
    let mut hasher = DefaultHasher::new();
    der.hash(&mut hasher);
    hasher.finish()
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prepare_pki_creates_tree() {
        let dir = tempfile::tempdir().unwrap();
        prepare_pki(dir.path()).unwrap();
        for sub in PKI_SUBDIRS {
            assert!(dir.path().join(sub).is_dir());
        }
        // Idempotent.
        prepare_pki(dir.path()).unwrap();
    }

    #[test]
    fn test_subject_log_dedupes() {
        let log = SubjectLog::new();
        log.note(Some(b"cert-a"));
        log.note(Some(b"cert-a"));
        log.note(Some(b"cert-b"));
        log.note(None);
        log.note(Some(b""));
        assert_eq!(log.distinct(), 2);
    }
}
