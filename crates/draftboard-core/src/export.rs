// Plain-text results export of a finished draft.

use std::fmt::Write;

use crate::model::{Draft, Pick};

/// Render final rosters, one block per manager in draft order.
///
/// ```text
/// Koopa Cup 2025
/// Started 2025-10-01 19:00 UTC
///
/// 1. Alice
///    Rd  1  Connor McDavid        EDM  C
///    Rd  2  Cale Makar            COL  D
/// ```
pub fn render_results(draft: &Draft) -> String {
    let mut out = String::new();
    let title = if draft.name.is_empty() { draft.id.as_str() } else { draft.name.as_str() };
    let _ = writeln!(out, "{title}");
    let _ = writeln!(out, "Started {}", draft.started.format("%Y-%m-%d %H:%M UTC"));
    let _ = writeln!(out, "Total picks: {}", draft.total_picks());

    for manager in &draft.managers {
        let _ = writeln!(out);
        let _ = writeln!(out, "{}. {}", manager.position, manager.name);
        if manager.picks.is_empty() {
            let _ = writeln!(out, "   (no picks)");
            continue;
        }
        // Every stored pick is listed, ordered by slot.
        let mut picks: Vec<(usize, &Pick)> = manager
            .picks
            .iter()
            .enumerate()
            .map(|(i, pick)| (pick.pick.unwrap_or(i), pick))
            .collect();
        picks.sort_by_key(|(slot, _)| *slot);
        for (slot, pick) in picks {
            let player = &pick.player;
            let _ = writeln!(
                out,
                "   Rd {:>2}  {:<22} {:<4} {}",
                slot + 1,
                player.full_name(),
                player.team,
                player.display_position()
            );
        }
    }

    out
}

/// File name for a results export: the draft name reduced to
/// `[a-z0-9-]`, falling back to the draft id.
pub fn results_file_name(draft_name: &str, draft_id: &str) -> String {
    let mut slug = String::new();
    for c in draft_name.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.ends_with('-') && !slug.is_empty() {
            slug.push('-');
        }
    }
    let slug = slug.trim_end_matches('-');
    let base = if slug.is_empty() { draft_id } else { slug };
    format!("{base}-results.txt")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{LocalizedName, Player};

    fn skater(id: &str, first: &str, last: &str, team: &str, pos: &str) -> Player {
        Player {
            id: id.into(),
            first_name: LocalizedName::new(first),
            last_name: LocalizedName::new(last),
            team: team.into(),
            position_code: pos.into(),
            headshot: None,
            emoji: None,
            sweater_number: None,
        }
    }

    #[test]
    fn renders_each_manager_with_rounds() {
        let names = vec!["Alice".to_string(), "Bob".to_string()];
        let mut draft = Draft::new("d1", "Koopa Cup", &names);
        draft.managers[0]
            .picks
            .push(Pick::new(skater("1", "Connor", "McDavid", "EDM", "C"), 0));
        draft.managers[1]
            .picks
            .push(Pick::new(skater("2", "Artemi", "Panarin", "NYR", "L"), 0));
        draft.managers[1].picks.push(Pick::new(Player::forfeit(), 1));

        let text = render_results(&draft);
        assert!(text.starts_with("Koopa Cup\n"));
        assert!(text.contains("Total picks: 3"));
        assert!(text.contains("1. Alice"));
        assert!(text.contains("Rd  1  Connor McDavid"));
        assert!(text.contains("Artemi Panarin         NYR  LW"));
        assert!(text.contains("Rd  2  Forfeited Pick"));
    }

    #[test]
    fn picks_with_sparse_slots_are_all_listed() {
        let names = vec!["Alice".to_string(), "Bob".to_string()];
        let mut draft = Draft::new("d2", "Sparse", &names);
        draft.managers[0]
            .picks
            .push(Pick::new(skater("10", "Alpha", "One", "BOS", "C"), 1));
        draft.managers[1]
            .picks
            .push(Pick::new(skater("11", "Beta", "Two", "BUF", "D"), 2));

        let text = render_results(&draft);
        assert!(text.contains("Rd  2  Alpha One"), "{text}");
        assert!(text.contains("Rd  3  Beta Two"), "{text}");
        assert!(!text.contains("(no picks)"));
    }

    #[test]
    fn picks_sharing_a_slot_are_both_listed() {
        let names = vec!["Alice".to_string(), "Bob".to_string()];
        let mut draft = Draft::new("d3", "Clash", &names);
        draft.managers[0]
            .picks
            .push(Pick::new(skater("1", "Connor", "McDavid", "EDM", "C"), 0));
        draft.managers[0]
            .picks
            .push(Pick::new(skater("2", "Cale", "Makar", "COL", "D"), 0));

        let text = render_results(&draft);
        assert!(text.contains("Connor McDavid"));
        assert!(text.contains("Cale Makar"));
    }

    #[test]
    fn empty_roster_is_marked() {
        let names = vec!["Alice".to_string(), "Bob".to_string()];
        let draft = Draft::new("d1", "", &names);
        let text = render_results(&draft);
        assert!(text.starts_with("d1\n"));
        assert_eq!(text.matches("(no picks)").count(), 2);
    }

    #[test]
    fn file_name_is_slugged() {
        assert_eq!(results_file_name("Koopa Cup 2025!", "x"), "koopa-cup-2025-results.txt");
        assert_eq!(results_file_name("  ", "abc"), "abc-results.txt");
    }
}
