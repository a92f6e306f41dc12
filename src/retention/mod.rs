// backuptool/src/retention/mod.rs
use chrono::{DateTime, Datelike, Duration, Months, Utc};

use crate::config::RetentionConfig;
use crate::storage::{BackupLevel, BackupMetadata};

/// Result of partitioning a metadata set against the current time.
#[derive(Debug)]
pub struct SweepOutcome {
    pub expired: Vec<BackupMetadata>,
    pub valid: Vec<BackupMetadata>,
}

/// Computes when a backup taken at `now` for the given level expires.
///
/// Daily and weekly windows are fixed-length. Monthly windows use calendar
/// arithmetic so month-end dates roll over correctly (Jan 31 + 1 month is
/// Feb 28/29, never Mar 3).
pub fn expiration_for(
    policy: &RetentionConfig,
    level: BackupLevel,
    now: DateTime<Utc>,
) -> DateTime<Utc> {
    match level {
        BackupLevel::Daily => now + Duration::days(policy.daily.retention_days),
        BackupLevel::Weekly => now + Duration::days(policy.weekly.retention_weeks * 7),
        BackupLevel::Monthly => now
            .checked_add_months(Months::new(policy.monthly.retention_months))
            .unwrap_or_else(|| now + Duration::days(i64::from(policy.monthly.retention_months) * 31)),
    }
}

/// Whether a *scheduled* trigger for this level should run today.
/// Manual/API-triggered backups bypass this check.
pub fn is_due(policy: &RetentionConfig, level: BackupLevel, now: DateTime<Utc>) -> bool {
    match level {
        BackupLevel::Daily => policy.daily.enabled,
        BackupLevel::Weekly => {
            policy.weekly.enabled
                && now.weekday().num_days_from_sunday() == policy.weekly.day_of_week
        }
        BackupLevel::Monthly => {
            policy.monthly.enabled && now.day() == policy.monthly.day_of_month
        }
    }
}

/// Partitions entries strictly by `expires_at < now`.
pub fn sweep(entries: Vec<BackupMetadata>, now: DateTime<Utc>) -> SweepOutcome {
    let (expired, valid) = entries.into_iter().partition(|m| m.expires_at < now);
    SweepOutcome { expired, valid }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DailyRetention, MonthlyRetention, WeeklyRetention};
    use crate::storage::StorageKind;
    use crate::storage::test_support::sample_metadata;
    use chrono::TimeZone;

    fn policy() -> RetentionConfig {
        RetentionConfig {
            daily: DailyRetention {
                enabled: true,
                retention_days: 30,
            },
            weekly: WeeklyRetention {
                enabled: true,
                retention_weeks: 12,
                day_of_week: 0,
            },
            monthly: MonthlyRetention {
                enabled: true,
                retention_months: 1,
                day_of_month: 1,
            },
        }
    }

    #[test]
    fn test_daily_and_weekly_expirations() {
        let now = Utc.with_ymd_and_hms(2026, 3, 10, 12, 0, 0).unwrap();
        let policy = policy();

        assert_eq!(
            expiration_for(&policy, BackupLevel::Daily, now),
            now + Duration::days(30)
        );
        assert_eq!(
            expiration_for(&policy, BackupLevel::Weekly, now),
            now + Duration::days(84)
        );
    }

    #[test]
    fn test_monthly_rollover_clamps_to_month_end() {
        let policy = policy();

        // Non-leap year: Jan 31 + 1 month lands on Feb 28.
        let jan31 = Utc.with_ymd_and_hms(2023, 1, 31, 3, 0, 0).unwrap();
        let expires = expiration_for(&policy, BackupLevel::Monthly, jan31);
        assert_eq!((expires.year(), expires.month(), expires.day()), (2023, 2, 28));

        // Leap year: Feb 29.
        let jan31_leap = Utc.with_ymd_and_hms(2024, 1, 31, 3, 0, 0).unwrap();
        let expires = expiration_for(&policy, BackupLevel::Monthly, jan31_leap);
        assert_eq!((expires.year(), expires.month(), expires.day()), (2024, 2, 29));
    }

    #[test]
    fn test_expiration_always_after_creation() {
        let now = Utc::now();
        let policy = policy();
        for level in [BackupLevel::Daily, BackupLevel::Weekly, BackupLevel::Monthly] {
            assert!(expiration_for(&policy, level, now) > now);
        }
    }

    #[test]
    fn test_is_due_per_level() {
        let policy = policy();
        // 2026-03-08 is a Sunday, 2026-03-01 is day 1.
        let sunday = Utc.with_ymd_and_hms(2026, 3, 8, 3, 0, 0).unwrap();
        let monday = Utc.with_ymd_and_hms(2026, 3, 9, 3, 0, 0).unwrap();
        let first = Utc.with_ymd_and_hms(2026, 3, 1, 3, 0, 0).unwrap();

        assert!(is_due(&policy, BackupLevel::Daily, monday));
        assert!(is_due(&policy, BackupLevel::Weekly, sunday));
        assert!(!is_due(&policy, BackupLevel::Weekly, monday));
        assert!(is_due(&policy, BackupLevel::Monthly, first));
        assert!(!is_due(&policy, BackupLevel::Monthly, monday));

        let mut disabled = policy;
        disabled.daily.enabled = false;
        assert!(!is_due(&disabled, BackupLevel::Daily, monday));
    }

    #[test]
    fn test_sweep_partitions_by_expiry() {
        let now = Utc::now();

        let mut expired = sample_metadata(StorageKind::Local);
        expired.created_at = now - Duration::days(31);
        expired.expires_at = expired.created_at + Duration::days(30);

        let mut valid = sample_metadata(StorageKind::Local);
        valid.created_at = now - Duration::days(1);
        valid.expires_at = valid.created_at + Duration::days(30);

        let outcome = sweep(vec![expired.clone(), valid.clone()], now);
        assert_eq!(outcome.expired.len(), 1);
        assert_eq!(outcome.expired[0].id, expired.id);
        assert_eq!(outcome.valid.len(), 1);
        assert_eq!(outcome.valid[0].id, valid.id);
    }
}
