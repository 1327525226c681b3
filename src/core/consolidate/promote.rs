//! Moving a member onto the keeper path.

use super::PromoteMode;
use crate::core::fingerprint::fingerprint_file;
use crate::error::ConsolidateError;
use std::ffi::OsString;
use std::fs;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Replace the file at `to` with the file at `from`
///
/// On error the source is still in place and the keeper file is untouched.
/// `Ok(Some(_))` means the keeper already holds the promoted content but
/// the source copy could not be deleted afterwards.
pub(crate) fn promote(
    from: &Path,
    to: &Path,
    mode: PromoteMode,
) -> Result<Option<io::Error>, ConsolidateError> {
    let leftover = match mode {
        PromoteMode::Rename => {
            fs::rename(from, to).map_err(|source| promote_error(from, to, source))?;
            None
        }
        PromoteMode::CopyVerify => copy_verify(from, to)?,
    };

    info!(from = %from.display(), to = %to.display(), mode = ?mode, "Promoted duplicate onto keeper");
    Ok(leftover)
}

/// Copy next to the keeper, check the copy, swap it in, then drop the source
fn copy_verify(from: &Path, to: &Path) -> Result<Option<io::Error>, ConsolidateError> {
    let expected = fingerprint_file(from)?;
    let staging = staging_path(to);

    fs::copy(from, &staging).map_err(|source| {
        let _ = fs::remove_file(&staging);
        promote_error(from, to, source)
    })?;

    install_verified(from, &staging, to, &expected)?;

    match fs::remove_file(from) {
        Ok(()) => Ok(None),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => {
            warn!(path = %from.display(), error = %e, "Promoted copy in place but source could not be removed");
            Ok(Some(e))
        }
    }
}

/// Move `staging` over the keeper if its digest is `expected`
///
/// A staging file that fails the check is deleted and the keeper is left
/// as it was.
fn install_verified(
    from: &Path,
    staging: &Path,
    to: &Path,
    expected: &str,
) -> Result<(), ConsolidateError> {
    let actual = match fingerprint_file(staging) {
        Ok(actual) => actual,
        Err(e) => {
            let _ = fs::remove_file(staging);
            return Err(e.into());
        }
    };

    if actual != expected {
        let _ = fs::remove_file(staging);
        return Err(ConsolidateError::VerificationFailed {
            from: from.to_path_buf(),
            to: to.to_path_buf(),
            expected: expected.to_string(),
            actual,
        });
    }
    debug!(path = %staging.display(), fingerprint = %actual, "Verified copy");

    // The staging file sits beside the keeper, so this rename stays on one volume
    fs::rename(staging, to).map_err(|source| {
        let _ = fs::remove_file(staging);
        promote_error(from, to, source)
    })
}

fn staging_path(keeper: &Path) -> PathBuf {
    let mut name = OsString::from(".");
    name.push(keeper.file_name().unwrap_or_default());
    name.push(".mediatool-partial");
    keeper.with_file_name(name)
}

fn promote_error(from: &Path, to: &Path, source: io::Error) -> ConsolidateError {
    ConsolidateError::Promote {
        from: from.to_path_buf(),
        to: to.to_path_buf(),
        source,
    }
}
