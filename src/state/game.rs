use super::AppState;
use crate::error::{GameError, GameResult};
use crate::roles::RoleAssignment;
use crate::store::{Expected, RoomUpdate};
use crate::types::*;

/// Reject anyone but the room admin
pub(super) fn require_admin(room: &Room, actor: &str, action: &str) -> GameResult<()> {
    if room.admin != actor {
        return Err(GameError::Unauthorized(format!(
            "only the admin can {}",
            action
        )));
    }
    Ok(())
}

/// The room's roles, provided `actor` holds `role` in them
pub(super) fn require_role<'a>(
    room: &'a Room,
    actor: &str,
    role: Role,
) -> GameResult<&'a RoleAssignment> {
    let roles = room.roles.as_ref().ok_or_else(|| {
        GameError::Store(format!("room {} is in play without roles", room.code))
    })?;
    if roles.holder(role) != Some(actor) {
        return Err(GameError::Unauthorized(format!("only the {} can do that", role)));
    }
    Ok(roles)
}

impl AppState {
    /// Actions `viewer` may take in the room's current state
    pub fn available_actions(room: &Room, registered: usize, viewer: &str) -> Vec<Action> {
        let is_admin = room.admin == viewer;
        let holds = |role: Role| {
            room.roles
                .as_ref()
                .and_then(|r| r.holder(role))
                .is_some_and(|h| h == viewer)
        };

        match room.phase {
            None if is_admin && registered == room.mode.player_count() => vec![Action::StartGame],
            Some(Phase::RajaReveal) | Some(Phase::MantriReveal) if is_admin => {
                vec![Action::AdvancePhase]
            }
            Some(Phase::MantriGuess) if holds(Role::Mantri) => vec![Action::SubmitMantriGuess],
            Some(Phase::RajaGuess) if holds(Role::Raja) => vec![Action::SubmitRajaGuess],
            Some(Phase::RoundResult) if is_admin => {
                if room.is_last_round() {
                    vec![Action::FinishGame]
                } else {
                    vec![Action::AdvanceRound]
                }
            }
            _ => Vec::new(),
        }
    }

    /// Apply a transition only if the room is still where we read it
    pub(super) async fn transition(
        &self,
        room: &Room,
        update: RoomUpdate,
        action: &str,
    ) -> GameResult<Room> {
        let updated = self
            .store
            .update_room(&room.code, update, Expected::of(room))
            .await
            .map_err(|e| {
                tracing::warn!("{} lost a race in room {}: {}", action, room.code, e);
                GameError::from(e)
            })?;

        tracing::info!(
            "Room {}: {} -> {} (round {}/{})",
            updated.code,
            phase_label(room.phase),
            phase_label(updated.phase),
            updated.current_round,
            updated.num_rounds
        );
        self.notify(&updated.code, updated.version);
        Ok(updated)
    }

    /// Deal roles for round 1 and leave the lobby
    pub async fn start_game(&self, code: &str, actor: &str) -> GameResult<Room> {
        let room = self.get_room(code).await?;
        require_admin(&room, actor, "start the game")?;
        if room.phase.is_some() {
            return Err(GameError::phase_mismatch("start the game", room.phase));
        }

        let players = self.store.get_players(&room.code).await?;
        if players.len() != room.mode.player_count() {
            return Err(GameError::InvalidConfiguration(format!(
                "{} of {} players have joined",
                players.len(),
                room.mode.player_count()
            )));
        }

        let roles = self.deal_roles(&players, room.mode)?;
        let update = RoomUpdate::to(Phase::RajaReveal)
            .round(1)
            .roles(roles)
            .guesses(PendingGuesses::default());
        let updated = self.transition(&room, update, "start_game").await?;

        self.log_lobby_event(&room.code, format!("{} started the game", actor)).await;
        Ok(updated)
    }

    /// Step through the reveal phases
    pub async fn advance_phase(&self, code: &str, actor: &str) -> GameResult<Room> {
        let room = self.get_room(code).await?;
        require_admin(&room, actor, "advance the phase")?;

        let next = match room.phase {
            Some(Phase::RajaReveal) => Phase::MantriReveal,
            Some(Phase::MantriReveal) => Phase::MantriGuess,
            other => return Err(GameError::phase_mismatch("advance the phase", other)),
        };
        self.transition(&room, RoomUpdate::to(next), "advance_phase").await
    }

    /// Deal fresh roles and begin the next round
    pub async fn advance_round(&self, code: &str, actor: &str) -> GameResult<Room> {
        let room = self.get_room(code).await?;
        require_admin(&room, actor, "start the next round")?;

        if room.phase != Some(Phase::RoundResult) {
            return Err(GameError::phase_mismatch("start the next round", room.phase));
        }
        if room.is_last_round() {
            return Err(GameError::PhaseMismatch(format!(
                "round {} is the last round; finish the game instead",
                room.current_round
            )));
        }

        let players = self.store.get_players(&room.code).await?;
        let roles = self.deal_roles(&players, room.mode)?;
        let update = RoomUpdate::to(Phase::RajaReveal)
            .round(room.current_round + 1)
            .roles(roles)
            .guesses(PendingGuesses::default());
        self.transition(&room, update, "advance_round").await
    }

    /// Close the game after the last round's result
    pub async fn finish_game(&self, code: &str, actor: &str) -> GameResult<Room> {
        let room = self.get_room(code).await?;
        require_admin(&room, actor, "finish the game")?;

        if room.phase != Some(Phase::RoundResult) {
            return Err(GameError::phase_mismatch("finish the game", room.phase));
        }
        if !room.is_last_round() {
            return Err(GameError::PhaseMismatch(format!(
                "round {} of {} still to play",
                room.current_round + 1,
                room.num_rounds
            )));
        }

        let updated = self
            .transition(&room, RoomUpdate::to(Phase::GameOver), "finish_game")
            .await?;
        self.log_lobby_event(&room.code, "Game over".to_string()).await;
        Ok(updated)
    }
}
