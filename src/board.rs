//! The match board: ranked, filtered and grouped analyses plus a plain-text
//! rendering for the terminal.

use chrono::NaiveDate;
use std::fmt::Write;

use crate::analysis::discrepancy::summarize;
use crate::analysis::grouping::{group_by_date, GroupedMatches};
use crate::analysis::ranking::{rank, BoardOptions};
use crate::teams::TeamDirectory;
use crate::types::{MatchAnalysis, MatchKey};

/// Rank `matches` with `options`, then group what survives by UTC date.
///
/// Grouping re-sorts each day by kickoff, so in discrepancy mode the sort
/// decides which matches make the cut and the day view stays chronological.
pub fn compose_board(
    matches: &[MatchAnalysis],
    options: BoardOptions,
    today: NaiveDate,
) -> Vec<GroupedMatches> {
    group_by_date(rank(matches, options), today)
}

/// Favourite label as shown on the board: the team's abbreviation when it
/// names one of the two sides, otherwise the label itself in capitals.
fn favorite_label(m: &MatchAnalysis, favorite: &str, directory: &TeamDirectory) -> String {
    if favorite == m.home_team || favorite == m.away_team {
        directory.abbreviation(favorite)
    } else {
        favorite.to_uppercase()
    }
}

/// One board line for a match.
pub fn render_line(m: &MatchAnalysis, selected: bool, directory: &TeamDirectory) -> String {
    let summary = summarize(m);
    format!(
        "{} {}  {:<3} v {:<3}  market {:<4} {:>3.0}%  model {:<4} {:>3.0}%  gap {:>4.1}pp{}",
        if selected { '>' } else { ' ' },
        m.kickoff.format("%H:%M"),
        directory.abbreviation(&m.home_team),
        directory.abbreviation(&m.away_team),
        favorite_label(m, &m.market_favorite, directory),
        m.market_favorite_prob * 100.0,
        favorite_label(m, &m.model_favorite, directory),
        m.model_favorite_prob * 100.0,
        summary.max_abs_delta * 100.0,
        if summary.high_conviction { " *" } else { "" },
    )
}

/// Render grouped matches as text, one header per day.
pub fn render_text(
    groups: &[GroupedMatches],
    selection: Option<&MatchKey>,
    directory: &TeamDirectory,
) -> String {
    if groups.is_empty() {
        return "No upcoming matches.\n".to_string();
    }

    let mut out = String::new();
    for (i, group) in groups.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        let _ = writeln!(out, "== {} ==", group.label);
        for m in &group.matches {
            let selected = selection.is_some_and(|key| m.matches_key(key));
            let _ = writeln!(out, "{}", render_line(m, selected, directory));
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::ranking::SortMode;
    use crate::types::{Discrepancy, Outcome};

    fn m(home: &str, away: &str, kickoff: &str, delta: f64) -> MatchAnalysis {
        let mut a = MatchAnalysis::sample(home, away, kickoff);
        a.discrepancies = vec![Discrepancy::new(Outcome::Home, 0.40, 0.40 + delta)];
        a
    }

    fn fixture_list() -> Vec<MatchAnalysis> {
        vec![
            m("Arsenal", "Chelsea", "2025-01-04T15:00:00Z", 0.02),
            m("Liverpool", "Everton", "2025-01-04T12:30:00Z", 0.08),
            m("Fulham", "Brentford", "2025-01-05T14:00:00Z", -0.01),
            m("Burnley", "Sunderland", "2025-01-07T19:45:00Z", 0.06),
        ]
    }

    fn today() -> NaiveDate {
        "2025-01-04".parse().unwrap()
    }

    #[test]
    fn test_compose_chronological() {
        let groups = compose_board(&fixture_list(), BoardOptions::default(), today());
        let labels: Vec<&str> = groups.iter().map(|g| g.label.as_str()).collect();
        assert_eq!(labels, vec!["TODAY", "TOMORROW", "TUESDAY, JANUARY 7"]);
        assert_eq!(groups[0].matches[0].home_team, "Liverpool");
        assert_eq!(groups[0].matches[1].home_team, "Arsenal");
    }

    #[test]
    fn test_compose_biggest_only_discrepancy() {
        let mut list = fixture_list();
        for i in 0..4 {
            list.push(m("Filler", "Opp", &format!("2025-01-1{i}T15:00:00Z"), 0.001));
        }
        let opts = BoardOptions { sort: SortMode::Discrepancy, biggest_only: true };
        let groups = compose_board(&list, opts, today());
        let total: usize = groups.iter().map(|g| g.matches.len()).sum();
        assert_eq!(total, 5);
        // All four real fixtures beat the fillers; the earliest filler wins the tie.
        let fillers: Vec<&MatchAnalysis> = groups
            .iter()
            .flat_map(|g| &g.matches)
            .filter(|m| m.home_team == "Filler")
            .collect();
        assert_eq!(fillers.len(), 1);
        assert_eq!(fillers[0].kickoff.to_rfc3339(), "2025-01-10T15:00:00+00:00");
        // Days stay chronological inside.
        assert_eq!(groups[0].matches[0].home_team, "Liverpool");
    }

    #[test]
    fn test_render_marks_selection_and_conviction() {
        let list = fixture_list();
        let groups = compose_board(&list, BoardOptions::default(), today());
        let selection = list[0].key();
        let text = render_text(&groups, Some(&selection), &TeamDirectory::new());

        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "== TODAY ==");
        assert!(lines[1].starts_with("  12:30  LIV v EVE"));
        assert!(lines[1].ends_with("gap  8.0pp *"));
        assert!(lines[2].starts_with("> 15:00  ARS v CHE"));
        assert!(!lines[2].ends_with('*'));
        assert_eq!(lines[3], "");
        assert_eq!(lines[4], "== TOMORROW ==");
    }

    #[test]
    fn test_render_draw_favourite() {
        let mut a = m("Arsenal", "Chelsea", "2025-01-04T15:00:00Z", 0.0);
        a.model_favorite = "Draw".to_string();
        let line = render_line(&a, false, &TeamDirectory::new());
        assert!(line.contains("market ARS"));
        assert!(line.contains("model DRAW"));
    }

    #[test]
    fn test_render_empty_board() {
        assert_eq!(render_text(&[], None, &TeamDirectory::new()), "No upcoming matches.\n");
    }
}
