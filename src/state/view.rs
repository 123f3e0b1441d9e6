use super::guess::{hidden_players, rani_candidates};
use super::AppState;
use crate::error::GameResult;
use crate::protocol::{PlayerView, RoomView};
use crate::scoring::{self, Scoreboard};
use crate::types::*;

impl AppState {
    /// Room as `viewer` is allowed to see it.
    ///
    /// Roles stay hidden until the phase reveals them, except the viewer's
    /// own. `None` gives the spectator view.
    pub async fn room_view(&self, code: &str, viewer: Option<&str>) -> GameResult<RoomView> {
        let room = self.get_room(code).await?;
        let players = self.store.get_players(&room.code).await?;
        let entries = self.store.get_round_scores(&room.code).await?;
        let board = Scoreboard::tally(&players, &entries, room.num_rounds);

        let viewer = viewer
            .map(str::trim)
            .filter(|v| players.iter().any(|p| p.name == *v));
        let resolved = room.phase.is_some_and(Phase::is_resolved);

        let role_for = |name: &str| -> Option<Role> {
            let role = room.roles.as_ref()?.role_of(name)?;
            let visible = viewer == Some(name) || room.phase.is_some_and(|p| p.reveals(role));
            visible.then_some(role)
        };

        let player_views = players
            .iter()
            .map(|p| PlayerView {
                name: p.name.clone(),
                role: role_for(&p.name),
                total: board.total_for(&p.name).unwrap_or(0),
                is_admin: p.name == room.admin,
            })
            .collect();

        let actions = viewer
            .map(|v| Self::available_actions(&room, players.len(), v))
            .unwrap_or_default();

        let candidates = match (&room.roles, room.phase) {
            (Some(roles), Some(Phase::MantriGuess))
                if actions.contains(&Action::SubmitMantriGuess) =>
            {
                hidden_players(roles)
            }
            (Some(roles), Some(Phase::RajaGuess))
                if actions.contains(&Action::SubmitRajaGuess) =>
            {
                rani_candidates(roles)
            }
            _ => Vec::new(),
        };

        let round_points = resolved.then(|| scoring::round_points(&entries, room.current_round));

        let winners = if room.phase == Some(Phase::GameOver) {
            board.standings().winners
        } else {
            Vec::new()
        };

        Ok(RoomView {
            code: room.code.clone(),
            mode: room.mode,
            num_rounds: room.num_rounds,
            current_round: room.current_round,
            phase: room.phase,
            version: room.version,
            admin: room.admin.clone(),
            you: viewer.map(str::to_string),
            your_role: viewer.and_then(role_for),
            players: player_views,
            actions,
            candidates,
            guesses: resolved.then(|| room.guesses.clone()),
            round_points,
            winners,
            lobby_log: room.lobby_log.clone(),
        })
    }
}
