//! Round scoring and ledger tallies.
//!
//! The calculators trust that guesses were validated by the state machine;
//! they only need a complete role assignment.

use crate::error::GameError;
use crate::roles::RoleAssignment;
use crate::types::{GameMode, Player, PlayerName, Role, RoundScoreEntry};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

pub const RAJA_POINTS: u32 = 1000;
pub const RAJA_MISSED_RANI_POINTS: u32 = 500;
pub const RANI_POINTS: u32 = 750;
pub const MANTRI_POINTS: u32 = 500;
pub const CHOR_ESCAPE_POINTS: u32 = 500;
pub const CHOR_RANI_BONUS: u32 = 500;
pub const SIPAHI_POINTS: u32 = 250;

/// Points awarded in one round, keyed by player
pub type RoundPoints = BTreeMap<PlayerName, u32>;

/// Ledger rows of one round; empty until that round is scored
pub fn round_points(entries: &[RoundScoreEntry], round: u32) -> RoundPoints {
    entries
        .iter()
        .filter(|e| e.round_number == round)
        .map(|e| (e.player_name.clone(), e.points))
        .collect()
}

fn holder(roles: &RoleAssignment, role: Role) -> Result<&str, GameError> {
    roles.holder(role).ok_or_else(|| {
        GameError::InvalidConfiguration(format!("role assignment has no {}", role))
    })
}

fn require_mode(roles: &RoleAssignment, mode: GameMode) -> Result<(), GameError> {
    if roles.mode() != mode {
        return Err(GameError::InvalidConfiguration(format!(
            "expected a {}-player assignment, got {}",
            mode.player_count(),
            roles.mode().player_count()
        )));
    }
    Ok(())
}

/// Mantri is right only when both the Chor and the Sipahi picks match
pub fn mantri_is_correct(
    roles: &RoleAssignment,
    guessed_chor: &str,
    guessed_sipahi: &str,
) -> Result<bool, GameError> {
    Ok(guessed_chor == holder(roles, Role::Chor)?
        && guessed_sipahi == holder(roles, Role::Sipahi)?)
}

fn zeroed(roles: &RoleAssignment) -> RoundPoints {
    roles.iter().map(|(_, name)| (name.to_string(), 0)).collect()
}

/// Split between Mantri and Chor, shared by both modes
fn award_mantri_outcome(
    points: &mut RoundPoints,
    roles: &RoleAssignment,
    guessed_chor: &str,
    guessed_sipahi: &str,
) -> Result<(), GameError> {
    let mantri = holder(roles, Role::Mantri)?;
    let chor = holder(roles, Role::Chor)?;

    if mantri_is_correct(roles, guessed_chor, guessed_sipahi)? {
        points.insert(mantri.to_string(), MANTRI_POINTS);
        points.insert(chor.to_string(), 0);
    } else {
        points.insert(mantri.to_string(), 0);
        points.insert(chor.to_string(), CHOR_ESCAPE_POINTS);
    }

    points.insert(holder(roles, Role::Sipahi)?.to_string(), SIPAHI_POINTS);
    Ok(())
}

/// Score a 4-player round. The Raja takes full points unconditionally.
pub fn score_four_player(
    roles: &RoleAssignment,
    guessed_chor: &str,
    guessed_sipahi: &str,
) -> Result<RoundPoints, GameError> {
    require_mode(roles, GameMode::FourPlayer)?;

    let mut points = zeroed(roles);
    award_mantri_outcome(&mut points, roles, guessed_chor, guessed_sipahi)?;
    points.insert(holder(roles, Role::Raja)?.to_string(), RAJA_POINTS);
    Ok(points)
}

/// Score a 5-player round, including the Raja's guess of the Rani.
///
/// A missed Rani halves the Raja and hands the Chor a bonus on top of
/// whatever the Mantri outcome gave them.
pub fn score_five_player(
    roles: &RoleAssignment,
    guessed_chor: &str,
    guessed_sipahi: &str,
    guessed_rani: &str,
) -> Result<RoundPoints, GameError> {
    require_mode(roles, GameMode::FivePlayer)?;

    let mut points = zeroed(roles);
    award_mantri_outcome(&mut points, roles, guessed_chor, guessed_sipahi)?;

    let raja = holder(roles, Role::Raja)?;
    let rani = holder(roles, Role::Rani)?;
    if guessed_rani == rani {
        points.insert(raja.to_string(), RAJA_POINTS);
    } else {
        points.insert(raja.to_string(), RAJA_MISSED_RANI_POINTS);
        let chor = holder(roles, Role::Chor)?;
        *points.entry(chor.to_string()).or_default() += CHOR_RANI_BONUS;
    }

    points.insert(rani.to_string(), RANI_POINTS);
    Ok(points)
}

/// One scoreboard line
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScoreRow {
    pub player: PlayerName,
    /// Points per round, index 0 is round 1
    pub rounds: Vec<u32>,
    pub total: u32,
}

/// Per-round points and totals, derived from the ledger
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Scoreboard {
    pub num_rounds: u32,
    pub rows: Vec<ScoreRow>,
}

/// Final ordering with tied winners
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Standings {
    pub rows: Vec<ScoreRow>,
    pub winners: Vec<PlayerName>,
    pub top_score: u32,
}

impl Scoreboard {
    /// Re-sum the ledger. Rows follow the order of `players`.
    pub fn tally(players: &[Player], entries: &[RoundScoreEntry], num_rounds: u32) -> Self {
        let mut by_player: HashMap<&str, (Vec<u32>, u32)> = players
            .iter()
            .map(|p| (p.name.as_str(), (vec![0; num_rounds as usize], 0)))
            .collect();

        for entry in entries {
            if let Some((rounds, total)) = by_player.get_mut(entry.player_name.as_str()) {
                *total += entry.points;
                if entry.round_number >= 1 && entry.round_number <= num_rounds {
                    rounds[(entry.round_number - 1) as usize] += entry.points;
                }
            }
        }

        let rows = players
            .iter()
            .map(|p| {
                let (rounds, total) = by_player.remove(p.name.as_str()).unwrap_or_default();
                ScoreRow {
                    player: p.name.clone(),
                    rounds,
                    total,
                }
            })
            .collect();

        Self { num_rounds, rows }
    }

    pub fn total_for(&self, player: &str) -> Option<u32> {
        self.rows.iter().find(|r| r.player == player).map(|r| r.total)
    }

    pub fn standings(&self) -> Standings {
        let mut rows = self.rows.clone();
        // stable: ties keep scoreboard order
        rows.sort_by(|a, b| b.total.cmp(&a.total));

        let top_score = rows.first().map(|r| r.total).unwrap_or(0);
        let winners = rows
            .iter()
            .take_while(|r| r.total == top_score)
            .map(|r| r.player.clone())
            .collect();

        Standings {
            rows,
            winners,
            top_score,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn four() -> RoleAssignment {
        RoleAssignment::from_pairs([
            ("A", Role::Raja),
            ("B", Role::Mantri),
            ("C", Role::Sipahi),
            ("D", Role::Chor),
        ])
        .unwrap()
    }

    fn five() -> RoleAssignment {
        RoleAssignment::from_pairs([
            ("A", Role::Raja),
            ("B", Role::Rani),
            ("C", Role::Mantri),
            ("D", Role::Sipahi),
            ("E", Role::Chor),
        ])
        .unwrap()
    }

    fn points(list: &[(&str, u32)]) -> RoundPoints {
        list.iter().map(|(n, p)| (n.to_string(), *p)).collect()
    }

    #[test]
    fn test_four_player_mantri_correct() {
        let result = score_four_player(&four(), "D", "C").unwrap();
        assert_eq!(
            result,
            points(&[("A", 1000), ("B", 500), ("C", 250), ("D", 0)])
        );
    }

    #[test]
    fn test_four_player_mantri_wrong() {
        let result = score_four_player(&four(), "C", "D").unwrap();
        assert_eq!(
            result,
            points(&[("A", 1000), ("B", 0), ("C", 250), ("D", 500)])
        );
    }

    #[test]
    fn test_four_player_total_is_branch_invariant() {
        let right: u32 = score_four_player(&four(), "D", "C").unwrap().values().sum();
        let wrong: u32 = score_four_player(&four(), "C", "D").unwrap().values().sum();
        assert_eq!(right, 1750);
        assert_eq!(wrong, 1750);
    }

    #[test]
    fn test_five_player_both_correct() {
        let result = score_five_player(&five(), "E", "D", "B").unwrap();
        assert_eq!(
            result,
            points(&[("A", 1000), ("B", 750), ("C", 500), ("D", 250), ("E", 0)])
        );
    }

    #[test]
    fn test_five_player_both_wrong() {
        let result = score_five_player(&five(), "D", "E", "C").unwrap();
        assert_eq!(
            result,
            points(&[("A", 500), ("B", 750), ("C", 0), ("D", 250), ("E", 1000)])
        );
    }

    #[test]
    fn test_five_player_partial_mantri_guess_is_wrong() {
        // right Chor, wrong Sipahi
        let result = score_five_player(&five(), "E", "B", "B").unwrap();
        assert_eq!(result["C"], 0);
        assert_eq!(result["E"], 500);
        assert_eq!(result["A"], 1000);
    }

    #[test]
    fn test_five_player_totals_per_raja_outcome() {
        let totals = |chor: &str, sipahi: &str, rani: &str| -> u32 {
            score_five_player(&five(), chor, sipahi, rani)
                .unwrap()
                .values()
                .sum()
        };
        // Raja right: 1000 + 750 + 250 + 500
        assert_eq!(totals("E", "D", "B"), 2500);
        assert_eq!(totals("D", "E", "B"), 2500);
        // Raja wrong: 500 + 750 + 250 + 500 + 500
        assert_eq!(totals("E", "D", "C"), 2500);
        assert_eq!(totals("D", "E", "C"), 2500);
    }

    #[test]
    fn test_mode_mismatch_is_rejected() {
        assert!(score_four_player(&five(), "E", "D").is_err());
        assert!(score_five_player(&four(), "D", "C", "A").is_err());
    }

    fn player(name: &str) -> Player {
        Player::new("ROOM01", name)
    }

    #[test]
    fn test_tally_sums_ledger() {
        let players = vec![player("A"), player("B")];
        let entries = vec![
            RoundScoreEntry::new("ROOM01", "A", 1, 1000),
            RoundScoreEntry::new("ROOM01", "B", 1, 250),
            RoundScoreEntry::new("ROOM01", "A", 2, 0),
            RoundScoreEntry::new("ROOM01", "B", 2, 500),
        ];

        let board = Scoreboard::tally(&players, &entries, 3);
        assert_eq!(board.rows[0].rounds, vec![1000, 0, 0]);
        assert_eq!(board.rows[1].rounds, vec![250, 500, 0]);
        assert_eq!(board.total_for("A"), Some(1000));
        assert_eq!(board.total_for("B"), Some(750));
        assert_eq!(board.total_for("Z"), None);
    }

    #[test]
    fn test_standings_report_joint_winners() {
        let players = vec![player("A"), player("B"), player("C")];
        let entries = vec![
            RoundScoreEntry::new("ROOM01", "A", 1, 500),
            RoundScoreEntry::new("ROOM01", "B", 1, 1000),
            RoundScoreEntry::new("ROOM01", "C", 1, 1000),
        ];

        let standings = Scoreboard::tally(&players, &entries, 1).standings();
        assert_eq!(standings.top_score, 1000);
        assert_eq!(standings.winners, vec!["B".to_string(), "C".to_string()]);
        assert_eq!(standings.rows.last().unwrap().player, "A");
    }
}
