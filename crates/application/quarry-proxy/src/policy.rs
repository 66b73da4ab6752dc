use camino::Utf8Path;
use chrono::{DateTime, Utc};
use quarry_core::{ChecksumSetting, UpdateSetting};
use quarry_storage::{digest_file, Algorithm, StorageError};
use std::time::SystemTime;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyDecision {
    Proceed,
    Skip,
}

/// Decide whether the local copy is fresh enough to skip the remote
/// check. `last_check` is the stamp of the most recent successful remote
/// interaction for this path, absent when nothing is cached yet.
pub fn update_decision(
    setting: UpdateSetting,
    last_check: Option<SystemTime>,
    now: SystemTime,
) -> PolicyDecision {
    let Some(checked) = last_check else {
        return PolicyDecision::Proceed;
    };
    match setting {
        UpdateSetting::Always => PolicyDecision::Proceed,
        UpdateSetting::Never => PolicyDecision::Skip,
        UpdateSetting::Daily => {
            let checked: DateTime<Utc> = checked.into();
            let now: DateTime<Utc> = now.into();
            if checked.date_naive() == now.date_naive() {
                PolicyDecision::Skip
            } else {
                PolicyDecision::Proceed
            }
        }
        UpdateSetting::Interval { minutes } => match now.duration_since(checked) {
            Ok(elapsed) if elapsed.as_secs() >= u64::from(minutes) * 60 => PolicyDecision::Proceed,
            // Clock skew puts the stamp in the future; count it as fresh.
            _ => PolicyDecision::Skip,
        },
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChecksumOutcome {
    Accepted,
    Rejected,
}

/// Compare a downloaded file against the digests parsed from its fetched
/// checksum companions. With no companions on record there is nothing to
/// verify and the download is accepted as-is.
pub fn apply_checksum_policy(
    setting: ChecksumSetting,
    file: &Utf8Path,
    expected: &[(Algorithm, String)],
) -> Result<ChecksumOutcome, StorageError> {
    if setting == ChecksumSetting::Ignore {
        return Ok(ChecksumOutcome::Accepted);
    }
    if expected.is_empty() {
        debug!("no checksum companions available for {file}, accepting");
        return Ok(ChecksumOutcome::Accepted);
    }
    for (algo, want) in expected {
        let actual = digest_file(*algo, file)?;
        if !actual.eq_ignore_ascii_case(want) {
            match setting {
                ChecksumSetting::Warn => {
                    warn!("{algo} mismatch for {file}: expected {want}, got {actual}");
                }
                ChecksumSetting::Fail => {
                    warn!("{algo} mismatch for {file}: expected {want}, got {actual}, rejecting");
                    return Ok(ChecksumOutcome::Rejected);
                }
                ChecksumSetting::Ignore => unreachable!("handled above"),
            }
        }
    }
    Ok(ChecksumOutcome::Accepted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use quarry_storage::digest_bytes;
    use std::time::Duration;

    fn minutes_ago(now: SystemTime, minutes: u64) -> SystemTime {
        now - Duration::from_secs(minutes * 60)
    }

    #[test]
    fn missing_local_copy_always_proceeds() {
        let now = SystemTime::now();
        for setting in [
            UpdateSetting::Always,
            UpdateSetting::Daily,
            UpdateSetting::Interval { minutes: 5 },
            UpdateSetting::Never,
        ] {
            assert_eq!(update_decision(setting, None, now), PolicyDecision::Proceed);
        }
    }

    #[test]
    fn never_skips_once_cached() {
        let now = SystemTime::now();
        assert_eq!(
            update_decision(UpdateSetting::Never, Some(minutes_ago(now, 60 * 24 * 365)), now),
            PolicyDecision::Skip
        );
    }

    #[test]
    fn always_rechecks() {
        let now = SystemTime::now();
        assert_eq!(
            update_decision(UpdateSetting::Always, Some(now), now),
            PolicyDecision::Proceed
        );
    }

    #[test]
    fn interval_boundary() {
        let now = SystemTime::now();
        let setting = UpdateSetting::Interval { minutes: 30 };
        assert_eq!(
            update_decision(setting, Some(minutes_ago(now, 10)), now),
            PolicyDecision::Skip
        );
        assert_eq!(
            update_decision(setting, Some(minutes_ago(now, 31)), now),
            PolicyDecision::Proceed
        );
    }

    #[test]
    fn daily_compares_calendar_days() {
        let now = SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        // ~4 hours earlier, same UTC day.
        assert_eq!(
            update_decision(UpdateSetting::Daily, Some(now - Duration::from_secs(4 * 3600)), now),
            PolicyDecision::Skip
        );
        assert_eq!(
            update_decision(UpdateSetting::Daily, Some(now - Duration::from_secs(30 * 3600)), now),
            PolicyDecision::Proceed
        );
    }

    fn temp_file(content: &[u8]) -> (tempfile::TempDir, camino::Utf8PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = camino::Utf8PathBuf::from_path_buf(dir.path().join("f.jar")).unwrap();
        std::fs::write(&path, content).unwrap();
        (dir, path)
    }

    #[test]
    fn fail_rejects_mismatch_but_warn_accepts() {
        let (_guard, path) = temp_file(b"payload");
        let wrong = vec![(Algorithm::Sha1, "0".repeat(40))];
        assert_eq!(
            apply_checksum_policy(ChecksumSetting::Fail, &path, &wrong).unwrap(),
            ChecksumOutcome::Rejected
        );
        assert_eq!(
            apply_checksum_policy(ChecksumSetting::Warn, &path, &wrong).unwrap(),
            ChecksumOutcome::Accepted
        );
        assert_eq!(
            apply_checksum_policy(ChecksumSetting::Ignore, &path, &wrong).unwrap(),
            ChecksumOutcome::Accepted
        );
    }

    #[test]
    fn fail_accepts_matching_digest() {
        let (_guard, path) = temp_file(b"payload");
        let good = vec![(Algorithm::Sha1, digest_bytes(Algorithm::Sha1, b"payload"))];
        assert_eq!(
            apply_checksum_policy(ChecksumSetting::Fail, &path, &good).unwrap(),
            ChecksumOutcome::Accepted
        );
    }

    #[test]
    fn fail_accepts_when_no_companions_were_found() {
        let (_guard, path) = temp_file(b"payload");
        assert_eq!(
            apply_checksum_policy(ChecksumSetting::Fail, &path, &[]).unwrap(),
            ChecksumOutcome::Accepted
        );
    }
}
