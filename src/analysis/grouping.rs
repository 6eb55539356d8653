//! Calendar grouping and relative date labels.
//!
//! Matches are bucketed by the UTC calendar date of their kickoff, so the
//! partition never depends on where the viewer is. Labels, on the other
//! hand, are relative to the viewer's local "today", which callers pass in
//! explicitly (see `ViewerClock`).

use chrono::{DateTime, FixedOffset, Local, NaiveDate, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::types::MatchAnalysis;

/// One calendar day of the board.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupedMatches {
    /// UTC calendar date shared by every match in the group.
    pub date: NaiveDate,
    pub label: String,
    /// Ascending by kickoff.
    pub matches: Vec<MatchAnalysis>,
}

/// Partition `matches` by UTC kickoff date.
///
/// Groups come out in ascending date order. Inside a group matches are
/// re-sorted by kickoff (stable), whatever order they arrived in.
pub fn group_by_date<'a, I>(matches: I, today: NaiveDate) -> Vec<GroupedMatches>
where
    I: IntoIterator<Item = &'a MatchAnalysis>,
{
    let mut buckets: BTreeMap<NaiveDate, Vec<MatchAnalysis>> = BTreeMap::new();
    for m in matches {
        buckets.entry(m.kickoff.date_naive()).or_default().push(m.clone());
    }

    buckets
        .into_iter()
        .map(|(date, mut matches)| {
            matches.sort_by_key(|m| m.kickoff);
            GroupedMatches {
                date,
                label: date_label(date, today),
                matches,
            }
        })
        .collect()
}

/// "TODAY", "TOMORROW", or e.g. "SATURDAY, JANUARY 4".
pub fn date_label(date: NaiveDate, today: NaiveDate) -> String {
    if date == today {
        "TODAY".to_string()
    } else if Some(date) == today.succ_opt() {
        "TOMORROW".to_string()
    } else {
        date.format("%A, %B %-d").to_string().to_uppercase()
    }
}

// ---------------------------------------------------------------------------
// Viewer clock
// ---------------------------------------------------------------------------

/// The viewer's timezone, fixed once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewerClock {
    /// Whatever the host system's local zone is.
    SystemLocal,
    /// An explicit offset from UTC.
    Fixed(FixedOffset),
}

impl ViewerClock {
    /// Build from a configured offset in minutes; `None` means system local.
    pub fn from_offset_minutes(minutes: Option<i32>) -> anyhow::Result<Self> {
        match minutes {
            None => Ok(ViewerClock::SystemLocal),
            Some(m) => m
                .checked_mul(60)
                .and_then(FixedOffset::east_opt)
                .map(ViewerClock::Fixed)
                .ok_or_else(|| anyhow::anyhow!("UTC offset out of range: {m} minutes")),
        }
    }

    /// The viewer's calendar date at instant `now`.
    pub fn date_at(&self, now: DateTime<Utc>) -> NaiveDate {
        match self {
            ViewerClock::SystemLocal => now.with_timezone(&Local).date_naive(),
            ViewerClock::Fixed(offset) => now.with_timezone(offset).date_naive(),
        }
    }

    pub fn today(&self) -> NaiveDate {
        self.date_at(Utc::now())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::ranking::{rank, BoardOptions, SortMode};
    use crate::types::{Discrepancy, Outcome};

    fn d(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn sample(home: &str, kickoff: &str) -> MatchAnalysis {
        MatchAnalysis::sample(home, "Opp", kickoff)
    }

    #[test]
    fn test_grouping_scenario() {
        let list = vec![
            sample("A", "2025-01-04T15:00:00Z"),
            sample("B", "2025-01-04T12:30:00Z"),
            sample("C", "2025-01-05T17:00:00Z"),
        ];
        let groups = group_by_date(&list, d("2025-01-01"));
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].date, d("2025-01-04"));
        assert_eq!(groups[1].date, d("2025-01-05"));
        let first: Vec<_> = groups[0].matches.iter().map(|m| m.kickoff.format("%H:%M").to_string()).collect();
        assert_eq!(first, vec!["12:30", "15:00"]);
    }

    #[test]
    fn test_partition_preserves_multiset() {
        let list = vec![
            sample("A", "2025-01-06T20:00:00Z"),
            sample("B", "2025-01-04T12:30:00Z"),
            sample("A", "2025-01-06T20:00:00Z"),
            sample("D", "2025-01-05T00:00:00Z"),
            sample("E", "2025-01-04T23:59:59Z"),
        ];
        let groups = group_by_date(&list, d("2025-01-04"));
        let mut flat: Vec<_> = groups.iter().flat_map(|g| g.matches.iter()).map(|m| m.key()).collect();
        let mut input: Vec<_> = list.iter().map(|m| m.key()).collect();
        let by_key = |a: &crate::types::MatchKey, b: &crate::types::MatchKey| {
            (a.kickoff, &a.home_team).cmp(&(b.kickoff, &b.home_team))
        };
        flat.sort_by(by_key);
        input.sort_by(by_key);
        assert_eq!(flat, input);
    }

    #[test]
    fn test_groups_sorted_regardless_of_outer_sort() {
        let mut list = vec![
            sample("late-small", "2025-01-04T20:00:00Z"),
            sample("early-big", "2025-01-04T12:00:00Z"),
            sample("next-day", "2025-01-05T12:00:00Z"),
        ];
        list[0].discrepancies = vec![Discrepancy::new(Outcome::Home, 0.4, 0.5)];
        list[1].discrepancies = vec![Discrepancy::new(Outcome::Home, 0.4, 0.41)];
        list[2].discrepancies = vec![Discrepancy::new(Outcome::Home, 0.4, 0.6)];

        let ranked = rank(&list, BoardOptions { sort: SortMode::Discrepancy, biggest_only: false });
        assert_eq!(ranked[0].home_team, "next-day");

        let groups = group_by_date(ranked, d("2025-01-04"));
        assert_eq!(groups[0].date, d("2025-01-04"));
        assert_eq!(groups[0].matches[0].home_team, "early-big");
        assert_eq!(groups[0].matches[1].home_team, "late-small");
        for g in &groups {
            assert!(g.matches.windows(2).all(|w| w[0].kickoff <= w[1].kickoff));
        }
        assert!(groups.windows(2).all(|w| w[0].date < w[1].date));
    }

    #[test]
    fn test_empty_input() {
        assert!(group_by_date(Vec::<&MatchAnalysis>::new(), d("2025-01-04")).is_empty());
    }

    #[test]
    fn test_labels() {
        let today = d("2025-01-04");
        assert_eq!(date_label(d("2025-01-04"), today), "TODAY");
        assert_eq!(date_label(d("2025-01-05"), today), "TOMORROW");
        assert_eq!(date_label(d("2025-01-06"), today), "MONDAY, JANUARY 6");
        assert_eq!(date_label(d("2025-01-03"), today), "FRIDAY, JANUARY 3");
    }

    #[test]
    fn test_label_across_month_and_year_end() {
        assert_eq!(date_label(d("2025-01-01"), d("2024-12-31")), "TOMORROW");
        assert_eq!(date_label(d("2025-03-01"), d("2025-02-28")), "TOMORROW");
    }

    #[test]
    fn test_utc_boundary_groups_by_utc_date() {
        // 23:30 UTC on the 4th is the 5th in UTC+2, but still groups under the 4th.
        let list = vec![sample("A", "2025-01-04T23:30:00Z"), sample("B", "2025-01-05T00:30:00Z")];
        let groups = group_by_date(&list, d("2025-01-04"));
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].date, d("2025-01-04"));
        assert_eq!(groups[0].label, "TODAY");
        assert_eq!(groups[1].label, "TOMORROW");
    }

    #[test]
    fn test_local_boundary_shifts_labels_not_groups() {
        // 23:30 UTC on Jan 4 is already Jan 5 for a UTC+2 viewer.
        let now: DateTime<Utc> = "2025-01-04T23:30:00Z".parse().unwrap();
        let plus_two = ViewerClock::from_offset_minutes(Some(120)).unwrap();
        let utc = ViewerClock::from_offset_minutes(Some(0)).unwrap();
        assert_eq!(plus_two.date_at(now), d("2025-01-05"));
        assert_eq!(utc.date_at(now), d("2025-01-04"));

        let list = vec![sample("A", "2025-01-05T12:00:00Z")];
        let for_plus_two = group_by_date(&list, plus_two.date_at(now));
        let for_utc = group_by_date(&list, utc.date_at(now));
        assert_eq!(for_plus_two[0].date, for_utc[0].date);
        assert_eq!(for_plus_two[0].label, "TODAY");
        assert_eq!(for_utc[0].label, "TOMORROW");
    }

    #[test]
    fn test_negative_offset() {
        let now: DateTime<Utc> = "2025-01-05T02:00:00Z".parse().unwrap();
        let minus_five = ViewerClock::from_offset_minutes(Some(-300)).unwrap();
        assert_eq!(minus_five.date_at(now), d("2025-01-04"));
        assert!(ViewerClock::from_offset_minutes(Some(24 * 60)).is_err());
        assert!(ViewerClock::from_offset_minutes(Some(40_000_000)).is_err());
        assert!(ViewerClock::from_offset_minutes(Some(i32::MIN)).is_err());
        assert_eq!(ViewerClock::from_offset_minutes(None).unwrap(), ViewerClock::SystemLocal);
    }
}
