//! Trims prior conversation turns so the newest ones fit a character budget.

use crate::models::request::Turn;

/// Default budget, in characters, for the clipped history
pub const DEFAULT_HISTORY_BUDGET: usize = 6000;

/// Keep the most recent turns whose combined length fits in `budget` characters.
///
/// Blank turns are dropped first. Turns are kept whole or not at all, and the result is in
/// chronological order. Length is counted in Unicode scalar values, not bytes.
pub fn clip_history(turns: &[Turn], budget: usize) -> Vec<Turn> {
    let mut used = 0usize;
    let mut kept: Vec<Turn> = turns
        .iter()
        .rev()
        .filter(|turn| !turn.content.trim().is_empty())
        .take_while(|turn| {
            let len = turn.content.chars().count();
            if used + len > budget {
                return false;
            }
            used += len;
            true
        })
        .cloned()
        .collect();

    kept.reverse();
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::role::Role;

    fn turn(role: Role, content: &str) -> Turn {
        Turn::new(role, content)
    }

    #[test]
    fn test_keeps_everything_under_budget() {
        let turns = vec![
            turn(Role::User, "hello"),
            turn(Role::Assistant, "hi there"),
            turn(Role::User, "how are you"),
        ];
        assert_eq!(clip_history(&turns, DEFAULT_HISTORY_BUDGET), turns);
    }

    #[test]
    fn test_drops_oldest_turns_first() {
        let turns = vec![
            turn(Role::User, "aaaaaaaaaa"),
            turn(Role::Assistant, "bbbbbbbbbb"),
            turn(Role::User, "cccccccccc"),
        ];
        let clipped = clip_history(&turns, 25);
        assert_eq!(clipped, turns[1..].to_vec());
    }

    #[test]
    fn test_stops_at_first_turn_that_does_not_fit() {
        // The oldest turn would fit on its own, but clipping stops at the first overflow.
        let turns = vec![
            turn(Role::User, "a"),
            turn(Role::Assistant, &"b".repeat(20)),
            turn(Role::User, "ccccc"),
        ];
        assert_eq!(clip_history(&turns, 10), vec![turn(Role::User, "ccccc")]);
    }

    #[test]
    fn test_skips_blank_turns() {
        let turns = vec![
            turn(Role::User, "first"),
            turn(Role::Assistant, "   \n"),
            turn(Role::System, ""),
            turn(Role::User, "second"),
        ];
        let clipped = clip_history(&turns, 100);
        assert_eq!(
            clipped,
            vec![turn(Role::User, "first"), turn(Role::User, "second")]
        );
    }

    #[test]
    fn test_counts_characters_not_bytes() {
        let turns = vec![turn(Role::User, "hội thảo")];
        assert_eq!(clip_history(&turns, 8).len(), 1);
        assert!(clip_history(&turns, 7).is_empty());
    }

    #[test]
    fn test_never_exceeds_budget() {
        let turns: Vec<Turn> = (0..50)
            .map(|i| turn(Role::User, &"x".repeat(i * 7 % 40 + 1)))
            .collect();
        for budget in [0, 1, 10, 100, 500] {
            let clipped = clip_history(&turns, budget);
            let total: usize = clipped.iter().map(|t| t.content.chars().count()).sum();
            assert!(total <= budget);
            assert_eq!(clipped, turns[turns.len() - clipped.len()..].to_vec());
        }
    }
}
