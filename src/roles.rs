//! Role dealing.
//!
//! Every round the registered players are shuffled onto the role set of the
//! room's mode. Nothing is remembered between rounds.

use crate::error::GameError;
use crate::types::{GameMode, PlayerName, Role};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Bijection between the roles of one game mode and the players holding them.
///
/// Keyed by role so lookups like "who is Chor" are direct. Serialized as a
/// `{role: player}` map and validated on the way back in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    try_from = "BTreeMap<Role, PlayerName>",
    into = "BTreeMap<Role, PlayerName>"
)]
pub struct RoleAssignment {
    holders: BTreeMap<Role, PlayerName>,
}

impl RoleAssignment {
    /// Build from `(player, role)` pairs
    pub fn from_pairs<I, S>(pairs: I) -> Result<Self, GameError>
    where
        I: IntoIterator<Item = (S, Role)>,
        S: Into<PlayerName>,
    {
        let mut holders = BTreeMap::new();
        for (player, role) in pairs {
            if holders.insert(role, player.into()).is_some() {
                return Err(GameError::InvalidConfiguration(format!(
                    "role {} assigned twice",
                    role
                )));
            }
        }
        Self::try_from(holders)
    }

    pub fn mode(&self) -> GameMode {
        if self.holders.contains_key(&Role::Rani) {
            GameMode::FivePlayer
        } else {
            GameMode::FourPlayer
        }
    }

    /// Player holding `role`, if the role exists in this mode
    pub fn holder(&self, role: Role) -> Option<&str> {
        self.holders.get(&role).map(String::as_str)
    }

    pub fn role_of(&self, player: &str) -> Option<Role> {
        self.holders
            .iter()
            .find(|(_, name)| name.as_str() == player)
            .map(|(role, _)| *role)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Role, &str)> {
        self.holders.iter().map(|(role, name)| (*role, name.as_str()))
    }

    /// Whether the assignment covers exactly this set of players
    pub fn covers<'a>(&self, players: impl IntoIterator<Item = &'a str>) -> bool {
        let assigned: HashSet<&str> = self.holders.values().map(String::as_str).collect();
        let given: HashSet<&str> = players.into_iter().collect();
        assigned == given
    }
}

impl TryFrom<BTreeMap<Role, PlayerName>> for RoleAssignment {
    type Error = GameError;

    fn try_from(holders: BTreeMap<Role, PlayerName>) -> Result<Self, Self::Error> {
        let mode = if holders.contains_key(&Role::Rani) {
            GameMode::FivePlayer
        } else {
            GameMode::FourPlayer
        };

        let roles: Vec<Role> = holders.keys().copied().collect();
        let mut expected = mode.roles().to_vec();
        expected.sort();
        if roles != expected {
            return Err(GameError::InvalidConfiguration(format!(
                "roles {:?} do not form a {}-player role set",
                roles,
                mode.player_count()
            )));
        }

        let distinct: HashSet<&str> = holders.values().map(String::as_str).collect();
        if distinct.len() != holders.len() {
            return Err(GameError::InvalidConfiguration(
                "a player holds more than one role".to_string(),
            ));
        }

        Ok(Self { holders })
    }
}

impl From<RoleAssignment> for BTreeMap<Role, PlayerName> {
    fn from(assignment: RoleAssignment) -> Self {
        assignment.holders
    }
}

/// Deal the role set of `mode` uniformly at random onto `players`.
///
/// Requires exactly `mode.player_count()` distinct names.
pub fn assign_roles<R: Rng + ?Sized>(
    players: &[PlayerName],
    mode: GameMode,
    rng: &mut R,
) -> Result<RoleAssignment, GameError> {
    if players.len() != mode.player_count() {
        return Err(GameError::InvalidConfiguration(format!(
            "expected {} players, got {}",
            mode.player_count(),
            players.len()
        )));
    }

    let distinct: HashSet<&str> = players.iter().map(String::as_str).collect();
    if distinct.len() != players.len() {
        return Err(GameError::InvalidConfiguration(
            "player names must be distinct".to_string(),
        ));
    }

    let mut seats = players.to_vec();
    seats.shuffle(rng);

    let holders = mode.roles().iter().copied().zip(seats).collect();
    Ok(RoleAssignment { holders })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashMap;

    fn names(list: &[&str]) -> Vec<PlayerName> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_assign_four_is_bijection() {
        let players = names(&["A", "B", "C", "D"]);
        for seed in 0..50 {
            let mut rng = StdRng::seed_from_u64(seed);
            let roles = assign_roles(&players, GameMode::FourPlayer, &mut rng).unwrap();

            assert_eq!(roles.mode(), GameMode::FourPlayer);
            assert!(roles.covers(players.iter().map(String::as_str)));
            for role in GameMode::FourPlayer.roles() {
                assert!(roles.holder(*role).is_some());
            }
            assert!(roles.holder(Role::Rani).is_none());
        }
    }

    #[test]
    fn test_assign_five_is_bijection() {
        let players = names(&["A", "B", "C", "D", "E"]);
        for seed in 0..50 {
            let mut rng = StdRng::seed_from_u64(seed);
            let roles = assign_roles(&players, GameMode::FivePlayer, &mut rng).unwrap();

            assert_eq!(roles.mode(), GameMode::FivePlayer);
            assert!(roles.covers(players.iter().map(String::as_str)));
            for player in &players {
                let role = roles.role_of(player).unwrap();
                assert_eq!(roles.holder(role), Some(player.as_str()));
            }
        }
    }

    #[test]
    fn test_assign_rejects_wrong_count() {
        let mut rng = StdRng::seed_from_u64(1);
        let result = assign_roles(&names(&["A", "B", "C"]), GameMode::FourPlayer, &mut rng);
        assert!(matches!(result, Err(GameError::InvalidConfiguration(_))));

        let result = assign_roles(
            &names(&["A", "B", "C", "D"]),
            GameMode::FivePlayer,
            &mut rng,
        );
        assert!(matches!(result, Err(GameError::InvalidConfiguration(_))));
    }

    #[test]
    fn test_assign_rejects_duplicate_names() {
        let mut rng = StdRng::seed_from_u64(1);
        let result = assign_roles(&names(&["A", "B", "B", "D"]), GameMode::FourPlayer, &mut rng);
        assert!(matches!(result, Err(GameError::InvalidConfiguration(_))));
    }

    #[test]
    fn test_every_player_can_be_raja() {
        let players = names(&["A", "B", "C", "D", "E"]);
        let mut rng = StdRng::seed_from_u64(7);
        let mut raja_counts: HashMap<String, u32> = HashMap::new();

        for _ in 0..500 {
            let roles = assign_roles(&players, GameMode::FivePlayer, &mut rng).unwrap();
            *raja_counts
                .entry(roles.holder(Role::Raja).unwrap().to_string())
                .or_default() += 1;
        }

        assert_eq!(raja_counts.len(), 5);
        // 100 expected per player; generous bounds
        for count in raja_counts.values() {
            assert!(*count > 50 && *count < 150, "skewed count {}", count);
        }
    }

    #[test]
    fn test_from_pairs_rejects_incomplete_set() {
        let result = RoleAssignment::from_pairs([
            ("A", Role::Raja),
            ("B", Role::Mantri),
            ("C", Role::Chor),
        ]);
        assert!(result.is_err());

        let result = RoleAssignment::from_pairs([
            ("A", Role::Raja),
            ("B", Role::Mantri),
            ("C", Role::Chor),
            ("C", Role::Sipahi),
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_serde_validates_bijection() {
        let roles = RoleAssignment::from_pairs([
            ("A", Role::Raja),
            ("B", Role::Mantri),
            ("C", Role::Sipahi),
            ("D", Role::Chor),
        ])
        .unwrap();
        let json = serde_json::to_string(&roles).unwrap();
        let parsed: RoleAssignment = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, roles);

        let broken = r#"{"Raja":"A","Mantri":"A","Sipahi":"C","Chor":"D"}"#;
        assert!(serde_json::from_str::<RoleAssignment>(broken).is_err());
    }
}
