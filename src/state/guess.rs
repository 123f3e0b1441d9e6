use super::game::require_role;
use super::AppState;
use crate::error::{GameError, GameResult};
use crate::roles::RoleAssignment;
use crate::scoring::{self, RoundPoints};
use crate::store::{Expected, RoomUpdate};
use crate::types::*;

/// Players whose roles the Mantri has to find: everyone but Raja and Mantri
pub(crate) fn hidden_players(roles: &RoleAssignment) -> Vec<PlayerName> {
    let mut hidden: Vec<PlayerName> = roles
        .iter()
        .filter(|(role, _)| !matches!(role, Role::Raja | Role::Mantri))
        .map(|(_, name)| name.to_string())
        .collect();
    hidden.sort();
    hidden
}

/// Anyone the Raja may name as Rani
pub(crate) fn rani_candidates(roles: &RoleAssignment) -> Vec<PlayerName> {
    let mut candidates: Vec<PlayerName> = roles
        .iter()
        .filter(|(role, _)| *role != Role::Raja)
        .map(|(_, name)| name.to_string())
        .collect();
    candidates.sort();
    candidates
}

/// In 4-player games the Sipahi pick is whoever is hidden and not picked as Chor
fn infer_sipahi(hidden: &[PlayerName], chor: &str) -> GameResult<PlayerName> {
    let rest: Vec<&PlayerName> = hidden.iter().filter(|n| n.as_str() != chor).collect();
    match rest.as_slice() {
        [only] => Ok(only.to_string()),
        _ => Err(GameError::AmbiguousInference(format!(
            "{} players left to be Sipahi after picking {} as Chor",
            rest.len(),
            chor
        ))),
    }
}

fn pick<'a>(candidates: &[PlayerName], name: &'a str, what: &str) -> GameResult<&'a str> {
    let name = name.trim();
    if !candidates.iter().any(|c| c == name) {
        return Err(GameError::InvalidGuess(format!(
            "{} is not a possible {}",
            name, what
        )));
    }
    Ok(name)
}

impl AppState {
    /// Mantri names the Chor (and in 5-player games the Sipahi)
    pub async fn submit_mantri_guess(
        &self,
        code: &str,
        actor: &str,
        chor: &str,
        sipahi: Option<&str>,
    ) -> GameResult<Room> {
        let room = self.get_room(code).await?;
        if room.phase != Some(Phase::MantriGuess) {
            return Err(GameError::phase_mismatch("submit the Mantri's guess", room.phase));
        }
        let roles = require_role(&room, actor, Role::Mantri)?;

        let hidden = hidden_players(roles);
        let chor = pick(&hidden, chor, "Chor")?;
        let sipahi = match (room.mode, sipahi) {
            (GameMode::FourPlayer, None) => infer_sipahi(&hidden, chor)?,
            (GameMode::FourPlayer, Some(_)) => {
                return Err(GameError::InvalidGuess(
                    "the Sipahi is inferred in 4-player games".to_string(),
                ))
            }
            (GameMode::FivePlayer, None) => {
                return Err(GameError::InvalidGuess(
                    "a Sipahi pick is required in 5-player games".to_string(),
                ))
            }
            (GameMode::FivePlayer, Some(s)) => {
                let s = pick(&hidden, s, "Sipahi")?;
                if s == chor {
                    return Err(GameError::InvalidGuess(
                        "Chor and Sipahi picks must differ".to_string(),
                    ));
                }
                s.to_string()
            }
        };

        tracing::info!(
            "Room {}: Mantri {} guessed Chor={} Sipahi={}",
            room.code,
            actor,
            chor,
            sipahi
        );

        let guesses = PendingGuesses {
            mantri_chor: Some(chor.to_string()),
            mantri_sipahi: Some(sipahi.clone()),
            raja_rani: None,
        };

        if room.mode.has_raja_guess() {
            return self
                .transition(
                    &room,
                    RoomUpdate::to(Phase::RajaGuess).guesses(guesses),
                    "submit_mantri_guess",
                )
                .await;
        }

        let points = scoring::score_four_player(roles, chor, &sipahi)?;
        self.commit_scores(&room, guesses, points).await
    }

    /// Raja names the Rani; closes a 5-player round
    pub async fn submit_raja_guess(&self, code: &str, actor: &str, rani: &str) -> GameResult<Room> {
        let room = self.get_room(code).await?;
        if room.phase != Some(Phase::RajaGuess) {
            return Err(GameError::phase_mismatch("submit the Raja's guess", room.phase));
        }
        let roles = require_role(&room, actor, Role::Raja)?;
        let rani = pick(&rani_candidates(roles), rani, "Rani")?;

        let (chor, sipahi) = match (&room.guesses.mantri_chor, &room.guesses.mantri_sipahi) {
            (Some(c), Some(s)) => (c.clone(), s.clone()),
            _ => {
                return Err(GameError::Store(format!(
                    "room {} reached RAJA_GUESS without a Mantri guess",
                    room.code
                )))
            }
        };

        tracing::info!("Room {}: Raja {} guessed Rani={}", room.code, actor, rani);

        let points = scoring::score_five_player(roles, &chor, &sipahi, rani)?;
        let guesses = PendingGuesses {
            raja_rani: Some(rani.to_string()),
            ..room.guesses.clone()
        };
        self.commit_scores(&room, guesses, points).await
    }

    /// Record the guesses, append the round's ledger rows and show the result
    async fn commit_scores(
        &self,
        room: &Room,
        guesses: PendingGuesses,
        points: RoundPoints,
    ) -> GameResult<Room> {
        let rows = points
            .iter()
            .map(|(name, pts)| RoundScoreEntry::new(&room.code, name, room.current_round, *pts))
            .collect();

        let updated = self
            .store
            .commit_round(
                &room.code,
                RoomUpdate::to(Phase::RoundResult).guesses(guesses),
                Expected::of(room),
                rows,
            )
            .await
            .map_err(|e| {
                tracing::warn!(
                    "Round {} of room {} not scored: {}",
                    room.current_round,
                    room.code,
                    e
                );
                GameError::from(e)
            })?;

        tracing::info!(
            "Room {}: round {} scored {:?}",
            updated.code,
            updated.current_round,
            points
        );
        self.notify(&updated.code, updated.version);
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;

    async fn round_points(state: &AppState, code: &str, round: u32) -> RoundPoints {
        let ledger = state.get_round_scores(code).await.unwrap();
        scoring::round_points(&ledger, round)
    }

    async fn started(num_players: u8, num_rounds: u32) -> (AppState, Room) {
        let (state, room) = full_room(num_players, num_rounds).await;
        state.start_game(&room.code, &room.admin).await.unwrap();
        to_mantri_guess(&state, &room).await;
        (state, room)
    }

    #[test]
    fn test_infer_sipahi() {
        let hidden = names(&["C", "D"]);
        assert_eq!(infer_sipahi(&hidden, "D").unwrap(), "C");

        let crowded = names(&["C", "D", "E"]);
        assert!(matches!(
            infer_sipahi(&crowded, "D"),
            Err(GameError::AmbiguousInference(_))
        ));
    }

    #[tokio::test]
    async fn test_four_player_correct_guess() {
        let (state, room) = started(4, 1).await;
        let raja = holder(&state, &room.code, Role::Raja).await;
        let mantri = holder(&state, &room.code, Role::Mantri).await;
        let sipahi = holder(&state, &room.code, Role::Sipahi).await;
        let chor = holder(&state, &room.code, Role::Chor).await;

        let result = state
            .submit_mantri_guess(&room.code, &mantri, &chor, None)
            .await
            .unwrap();
        assert_eq!(result.phase, Some(Phase::RoundResult));
        assert_eq!(result.guesses.mantri_sipahi.as_deref(), Some(sipahi.as_str()));

        let points = round_points(&state, &room.code, 1).await;
        assert_eq!(points.len(), 4);
        assert_eq!(points[&mantri], 500);
        assert_eq!(points[&chor], 0);
        assert_eq!(points[&raja], 1000);
        assert_eq!(points[&sipahi], 250);
    }

    #[tokio::test]
    async fn test_four_player_wrong_guess() {
        let (state, room) = started(4, 1).await;
        let raja = holder(&state, &room.code, Role::Raja).await;
        let mantri = holder(&state, &room.code, Role::Mantri).await;
        let sipahi = holder(&state, &room.code, Role::Sipahi).await;
        let chor = holder(&state, &room.code, Role::Chor).await;

        // picking the Sipahi as Chor makes the inferred Sipahi the real Chor
        state
            .submit_mantri_guess(&room.code, &mantri, &sipahi, None)
            .await
            .unwrap();

        let points = round_points(&state, &room.code, 1).await;
        assert_eq!(points[&mantri], 0);
        assert_eq!(points[&chor], 500);
        assert_eq!(points[&raja], 1000);
        assert_eq!(points[&sipahi], 250);
    }

    #[tokio::test]
    async fn test_five_player_both_correct() {
        let (state, room) = started(5, 1).await;
        let raja = holder(&state, &room.code, Role::Raja).await;
        let rani = holder(&state, &room.code, Role::Rani).await;
        let mantri = holder(&state, &room.code, Role::Mantri).await;
        let sipahi = holder(&state, &room.code, Role::Sipahi).await;
        let chor = holder(&state, &room.code, Role::Chor).await;

        let after_mantri = state
            .submit_mantri_guess(&room.code, &mantri, &chor, Some(sipahi.as_str()))
            .await
            .unwrap();
        assert_eq!(after_mantri.phase, Some(Phase::RajaGuess));
        assert!(state.get_round_scores(&room.code).await.unwrap().is_empty());

        let result = state
            .submit_raja_guess(&room.code, &raja, &rani)
            .await
            .unwrap();
        assert_eq!(result.phase, Some(Phase::RoundResult));

        let points = round_points(&state, &room.code, 1).await;
        assert_eq!(points[&mantri], 500);
        assert_eq!(points[&chor], 0);
        assert_eq!(points[&sipahi], 250);
        assert_eq!(points[&raja], 1000);
        assert_eq!(points[&rani], 750);
    }

    #[tokio::test]
    async fn test_five_player_both_wrong() {
        let (state, room) = started(5, 1).await;
        let raja = holder(&state, &room.code, Role::Raja).await;
        let rani = holder(&state, &room.code, Role::Rani).await;
        let mantri = holder(&state, &room.code, Role::Mantri).await;
        let sipahi = holder(&state, &room.code, Role::Sipahi).await;
        let chor = holder(&state, &room.code, Role::Chor).await;

        state
            .submit_mantri_guess(&room.code, &mantri, &sipahi, Some(chor.as_str()))
            .await
            .unwrap();
        state
            .submit_raja_guess(&room.code, &raja, &mantri)
            .await
            .unwrap();

        let points = round_points(&state, &room.code, 1).await;
        assert_eq!(points[&chor], 1000);
        assert_eq!(points[&raja], 500);
        assert_eq!(points[&rani], 750);
        assert_eq!(points[&sipahi], 250);
        assert_eq!(points[&mantri], 0);
    }

    #[tokio::test]
    async fn test_non_mantri_is_unauthorized() {
        let (state, room) = started(4, 1).await;
        let raja = holder(&state, &room.code, Role::Raja).await;
        let chor = holder(&state, &room.code, Role::Chor).await;

        let result = state.submit_mantri_guess(&room.code, &raja, &chor, None).await;
        assert!(matches!(result, Err(GameError::Unauthorized(_))));

        let result = state.submit_mantri_guess(&room.code, "Nobody", &chor, None).await;
        assert!(matches!(result, Err(GameError::Unauthorized(_))));

        let room = state.get_room(&room.code).await.unwrap();
        assert_eq!(room.phase, Some(Phase::MantriGuess));
        assert!(state.get_round_scores(&room.code).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_submission_scores_once() {
        let (state, room) = started(4, 1).await;
        let mantri = holder(&state, &room.code, Role::Mantri).await;
        let chor = holder(&state, &room.code, Role::Chor).await;

        state
            .submit_mantri_guess(&room.code, &mantri, &chor, None)
            .await
            .unwrap();
        let again = state
            .submit_mantri_guess(&room.code, &mantri, &chor, None)
            .await;
        assert!(matches!(again, Err(GameError::PhaseMismatch(_))));

        assert_eq!(state.get_round_scores(&room.code).await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_racing_submissions_score_once() {
        let (state, room) = started(4, 1).await;
        let mantri = holder(&state, &room.code, Role::Mantri).await;
        let chor = holder(&state, &room.code, Role::Chor).await;

        let (a, b) = tokio::join!(
            state.submit_mantri_guess(&room.code, &mantri, &chor, None),
            state.submit_mantri_guess(&room.code, &mantri, &chor, None)
        );
        assert!(a.is_ok() != b.is_ok());
        let err = a.err().or(b.err()).unwrap();
        assert!(matches!(err, GameError::PhaseMismatch(_)));

        assert_eq!(state.get_round_scores(&room.code).await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_mantri_guess_before_reveals_is_phase_mismatch() {
        let (state, room) = full_room(4, 1).await;
        state.start_game(&room.code, &room.admin).await.unwrap();
        let mantri = holder(&state, &room.code, Role::Mantri).await;
        let chor = holder(&state, &room.code, Role::Chor).await;

        let result = state.submit_mantri_guess(&room.code, &mantri, &chor, None).await;
        assert!(matches!(result, Err(GameError::PhaseMismatch(_))));
    }

    #[tokio::test]
    async fn test_ineligible_picks_are_rejected() {
        let (state, room) = started(4, 1).await;
        let raja = holder(&state, &room.code, Role::Raja).await;
        let mantri = holder(&state, &room.code, Role::Mantri).await;
        let sipahi = holder(&state, &room.code, Role::Sipahi).await;
        let chor = holder(&state, &room.code, Role::Chor).await;

        for bad_chor in [raja.as_str(), mantri.as_str(), "Stranger"] {
            let result = state
                .submit_mantri_guess(&room.code, &mantri, bad_chor, None)
                .await;
            assert!(matches!(result, Err(GameError::InvalidGuess(_))));
        }

        let result = state
            .submit_mantri_guess(&room.code, &mantri, &chor, Some(sipahi.as_str()))
            .await;
        assert!(matches!(result, Err(GameError::InvalidGuess(_))));

        let room = state.get_room(&room.code).await.unwrap();
        assert_eq!(room.phase, Some(Phase::MantriGuess));
    }

    #[tokio::test]
    async fn test_five_player_sipahi_pick_rules() {
        let (state, room) = started(5, 1).await;
        let mantri = holder(&state, &room.code, Role::Mantri).await;
        let chor = holder(&state, &room.code, Role::Chor).await;
        let raja = holder(&state, &room.code, Role::Raja).await;

        let missing = state.submit_mantri_guess(&room.code, &mantri, &chor, None).await;
        assert!(matches!(missing, Err(GameError::InvalidGuess(_))));

        let same = state
            .submit_mantri_guess(&room.code, &mantri, &chor, Some(chor.as_str()))
            .await;
        assert!(matches!(same, Err(GameError::InvalidGuess(_))));

        let raja_pick = state
            .submit_mantri_guess(&room.code, &mantri, &chor, Some(raja.as_str()))
            .await;
        assert!(matches!(raja_pick, Err(GameError::InvalidGuess(_))));
    }

    #[tokio::test]
    async fn test_raja_guess_rules() {
        let (state, room) = started(5, 1).await;
        let raja = holder(&state, &room.code, Role::Raja).await;
        let rani = holder(&state, &room.code, Role::Rani).await;
        let mantri = holder(&state, &room.code, Role::Mantri).await;
        let sipahi = holder(&state, &room.code, Role::Sipahi).await;
        let chor = holder(&state, &room.code, Role::Chor).await;

        let early = state.submit_raja_guess(&room.code, &raja, &rani).await;
        assert!(matches!(early, Err(GameError::PhaseMismatch(_))));

        state
            .submit_mantri_guess(&room.code, &mantri, &chor, Some(sipahi.as_str()))
            .await
            .unwrap();

        let wrong_actor = state.submit_raja_guess(&room.code, &rani, &rani).await;
        assert!(matches!(wrong_actor, Err(GameError::Unauthorized(_))));

        let self_pick = state.submit_raja_guess(&room.code, &raja, &raja).await;
        assert!(matches!(self_pick, Err(GameError::InvalidGuess(_))));

        let room = state.get_room(&room.code).await.unwrap();
        assert_eq!(room.phase, Some(Phase::RajaGuess));
    }

    #[tokio::test]
    async fn test_four_player_rooms_never_take_raja_guess() {
        let (state, room) = started(4, 1).await;
        let raja = holder(&state, &room.code, Role::Raja).await;
        let mantri = holder(&state, &room.code, Role::Mantri).await;

        let result = state.submit_raja_guess(&room.code, &raja, &mantri).await;
        assert!(matches!(result, Err(GameError::PhaseMismatch(_))));
    }

    #[tokio::test]
    async fn test_last_round_only_finishes() {
        let (state, room) = full_room(4, 2).await;
        state.start_game(&room.code, &room.admin).await.unwrap();
        play_round(&state, &room).await;

        let next = state.advance_round(&room.code, &room.admin).await.unwrap();
        assert_eq!(next.current_round, 2);
        assert_eq!(next.phase, Some(Phase::RajaReveal));
        assert_eq!(next.guesses, PendingGuesses::default());

        let early_finish = state.finish_game(&room.code, &room.admin).await;
        assert!(matches!(early_finish, Err(GameError::PhaseMismatch(_))));

        play_round(&state, &room).await;

        let result = state.advance_round(&room.code, &room.admin).await;
        assert!(matches!(result, Err(GameError::PhaseMismatch(_))));

        let over = state.finish_game(&room.code, &room.admin).await.unwrap();
        assert_eq!(over.phase, Some(Phase::GameOver));
        assert_eq!(state.get_round_scores(&room.code).await.unwrap().len(), 8);

        // terminal
        let result = state.advance_phase(&room.code, &room.admin).await;
        assert!(matches!(result, Err(GameError::PhaseMismatch(_))));
    }
}
