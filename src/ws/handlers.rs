//! WebSocket message dispatch
//!
//! Every action runs as the session's player; the state machine decides
//! whether that player may take it.

use crate::error::GameResult;
use crate::protocol::{ClientMessage, ServerMessage};
use crate::state::AppState;
use std::sync::Arc;

use super::Session;

/// Handle a client message; every message gets exactly one reply
pub async fn handle_message(
    msg: ClientMessage,
    session: &Session,
    state: &Arc<AppState>,
) -> ServerMessage {
    let code = session.room_code.as_str();
    let actor = session.name.as_str();

    let result = match msg {
        ClientMessage::StartGame => state.start_game(code, actor).await.map(|_| ()),
        ClientMessage::AdvancePhase => state.advance_phase(code, actor).await.map(|_| ()),
        ClientMessage::AdvanceRound => state.advance_round(code, actor).await.map(|_| ()),
        ClientMessage::FinishGame => state.finish_game(code, actor).await.map(|_| ()),

        ClientMessage::SubmitMantriGuess { chor, sipahi } => state
            .submit_mantri_guess(code, actor, &chor, sipahi.as_deref())
            .await
            .map(|_| ()),

        ClientMessage::SubmitRajaGuess { rani } => state
            .submit_raja_guess(code, actor, &rani)
            .await
            .map(|_| ()),

        ClientMessage::RequestState => Ok(()),

        ClientMessage::RequestScoreboard => {
            return respond(scoreboard_message(state, code).await);
        }
    };

    if let Err(e) = result {
        tracing::warn!("{} rejected in room {}: {}", actor, code, e);
        return e.into();
    }
    respond(state_message(state, session).await)
}

/// Personal view for the session's player
pub async fn state_message(state: &AppState, session: &Session) -> GameResult<ServerMessage> {
    let room = state
        .room_view(&session.room_code, Some(session.name.as_str()))
        .await?;
    Ok(ServerMessage::State { room })
}

async fn scoreboard_message(state: &AppState, code: &str) -> GameResult<ServerMessage> {
    let scoreboard = state.scoreboard(code).await?;
    let standings = scoreboard.standings();
    Ok(ServerMessage::Scoreboard {
        scoreboard,
        standings,
    })
}

fn respond(result: GameResult<ServerMessage>) -> ServerMessage {
    result.unwrap_or_else(ServerMessage::from)
}
