//! Report grouping and rendering.
//!
//! The aggregate's flat record list is grouped by remaining days (optionally
//! also by lock mode) and rendered either as a human-readable summary or as
//! CSV for spreadsheet import.

use std::collections::BTreeMap;
use std::fmt::Write;

use crate::types::{AggregateResult, LockMode, RetentionRecord};

const CSV_HEADER: &str = "Time,RemainingDays,LockMode,Count,Size";

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// One row of the rendered report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportGroup {
    pub remaining_days: i64,
    pub lock_mode: LockMode,
    pub count: u64,
    pub size_bytes: u64,
}

/// Group retention records by remaining days, ascending.
///
/// With `group_by_mode` set, records that share a day but differ in lock
/// mode land in separate rows. Otherwise a day's row shows the most common
/// mode among its records; ties resolve to the smaller mode in the
/// GOVERNANCE < COMPLIANCE < Unknown ordering, keeping the output
/// deterministic regardless of worker completion order.
pub fn group_records(records: &[RetentionRecord], group_by_mode: bool) -> Vec<ReportGroup> {
    let mut groups: BTreeMap<(i64, Option<LockMode>), (u64, u64, BTreeMap<LockMode, u64>)> =
        BTreeMap::new();

    for record in records {
        let mode_key = group_by_mode.then_some(record.lock_mode);
        let entry = groups
            .entry((record.remaining_days, mode_key))
            .or_insert_with(|| (0, 0, BTreeMap::new()));
        entry.0 += 1;
        entry.1 += record.size_bytes;
        *entry.2.entry(record.lock_mode).or_insert(0) += 1;
    }

    groups
        .into_iter()
        .map(
            |((remaining_days, mode_key), (count, size_bytes, mode_counts))| ReportGroup {
                remaining_days,
                lock_mode: mode_key.unwrap_or_else(|| representative_mode(&mode_counts)),
                count,
                size_bytes,
            },
        )
        .collect()
}

fn representative_mode(mode_counts: &BTreeMap<LockMode, u64>) -> LockMode {
    let mut best = LockMode::Unknown;
    let mut best_count = 0;
    for (mode, count) in mode_counts {
        // Strictly greater: on a tie the earlier (smaller) mode wins.
        if *count > best_count {
            best = *mode;
            best_count = *count;
        }
    }
    best
}

/// Render the aggregate as CSV.
///
/// One row per group, no totals row; an empty report renders the header
/// line only. `generated_at` is repeated in every row so concatenated
/// exports from repeated runs stay attributable.
pub fn render_csv(aggregate: &AggregateResult, group_by_mode: bool, generated_at: &str) -> String {
    let mut output = String::new();
    output.push_str(CSV_HEADER);
    output.push('\n');

    for group in group_records(&aggregate.records, group_by_mode) {
        writeln!(
            output,
            "{},{},{},{},{}",
            generated_at, group.remaining_days, group.lock_mode, group.count, group.size_bytes
        )
        .unwrap();
    }

    output
}

/// Render the aggregate as a human-readable summary.
pub fn render_human(
    aggregate: &AggregateResult,
    group_by_mode: bool,
    bucket: &str,
    generated_at: &str,
) -> String {
    let mut output = String::new();

    writeln!(output, "Retention report for bucket '{bucket}' ({generated_at})").unwrap();
    writeln!(output).unwrap();

    if aggregate.records.is_empty() {
        writeln!(output, "No locked objects found in the bucket.").unwrap();
    } else {
        writeln!(
            output,
            "{:>14}  {:<10}  {:>8}  {:>12}",
            "RemainingDays", "LockMode", "Objects", "Size (MB)"
        )
        .unwrap();
        for group in group_records(&aggregate.records, group_by_mode) {
            writeln!(
                output,
                "{:>14}  {:<10}  {:>8}  {:>12.2}",
                group.remaining_days,
                group.lock_mode.as_str(),
                group.count,
                group.size_bytes as f64 / BYTES_PER_MB
            )
            .unwrap();
        }
    }

    writeln!(output).unwrap();
    writeln!(output, "Total objects: {}", aggregate.total_objects).unwrap();
    writeln!(
        output,
        "Total size: {:.2} MB",
        aggregate.total_bytes as f64 / BYTES_PER_MB
    )
    .unwrap();
    writeln!(output, "Locked objects: {}", aggregate.total_locked_objects()).unwrap();
    writeln!(
        output,
        "Locked size: {:.2} MB",
        aggregate.total_locked_bytes as f64 / BYTES_PER_MB
    )
    .unwrap();

    output
}


/// Property-based tests for report grouping.
#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    use chrono::{Duration, Utc};

    fn arb_records() -> impl Strategy<Value = Vec<RetentionRecord>> {
        proptest::collection::vec(
            (0i64..100, 0u8..3, 1u64..10_000).prop_map(|(days, mode, size)| {
                let lock_mode = match mode {
                    0 => LockMode::Governance,
                    1 => LockMode::Compliance,
                    _ => LockMode::Unknown,
                };
                RetentionRecord {
                    key: format!("key-{days}-{size}"),
                    retain_until: Utc::now() + Duration::days(days),
                    remaining_days: days,
                    lock_mode,
                    size_bytes: size,
                }
            }),
            0..50,
        )
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Groups partition the records: counts and sizes always add up.
        #[test]
        fn grouping_partitions_records(
            records in arb_records(),
            group_by_mode in proptest::bool::ANY,
        ) {
            let groups = group_records(&records, group_by_mode);

            let group_count: u64 = groups.iter().map(|g| g.count).sum();
            let group_size: u64 = groups.iter().map(|g| g.size_bytes).sum();
            let record_size: u64 = records.iter().map(|r| r.size_bytes).sum();

            prop_assert_eq!(group_count, records.len() as u64);
            prop_assert_eq!(group_size, record_size);
        }

        /// Rows come out sorted by remaining days, ascending.
        #[test]
        fn grouping_sorted_by_remaining_days(
            records in arb_records(),
            group_by_mode in proptest::bool::ANY,
        ) {
            let groups = group_records(&records, group_by_mode);

            for window in groups.windows(2) {
                prop_assert!(window[0].remaining_days <= window[1].remaining_days);
            }
        }

        /// Grouping is insensitive to record order.
        #[test]
        fn grouping_is_order_independent(
            mut records in arb_records(),
            group_by_mode in proptest::bool::ANY,
        ) {
            let forward = group_records(&records, group_by_mode);
            records.reverse();
            let backward = group_records(&records, group_by_mode);

            prop_assert_eq!(forward, backward);
        }
    }
}
