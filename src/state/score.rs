use crate::error::GameResult;
use crate::scoring::Scoreboard;
use crate::state::AppState;

impl AppState {
    /// Per-round points and totals, re-summed from the ledger on every call
    pub async fn scoreboard(&self, code: &str) -> GameResult<Scoreboard> {
        let room = self.get_room(code).await?;
        let players = self.store.get_players(&room.code).await?;
        let entries = self.store.get_round_scores(&room.code).await?;
        Ok(Scoreboard::tally(&players, &entries, room.num_rounds))
    }
}
