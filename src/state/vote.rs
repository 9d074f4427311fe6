use super::{require_player, AppState, RoomSlot};
use crate::broadcast::Outbox;
use crate::error::{GameError, GameResult};
use crate::protocol::{ImpostorInfo, ServerMessage, VotedPlayer, VotingResults, Winners};
use crate::types::*;
use indexmap::IndexMap;

/// Which side of the decision phase a player backs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionChoice {
    NextRound,
    ReadyToVote,
}

impl AppState {
    pub async fn vote_next_round(&self, code: &str, player_id: &str) -> GameResult<()> {
        self.cast_decision_vote(code, player_id, DecisionChoice::NextRound)
            .await
    }

    pub async fn vote_ready_to_vote(&self, code: &str, player_id: &str) -> GameResult<()> {
        self.cast_decision_vote(code, player_id, DecisionChoice::ReadyToVote)
            .await
    }

    /// Move a player's decision vote to one side. Backing one side withdraws
    /// the other; repeating a vote changes nothing.
    async fn cast_decision_vote(
        &self,
        code: &str,
        player_id: &str,
        choice: DecisionChoice,
    ) -> GameResult<()> {
        let mut rooms = self.rooms.write().await;
        let slot = rooms.get_mut(code).ok_or(GameError::RoomNotFound)?;
        require_player(&slot.room, player_id)?;
        if slot.room.game_state != GameState::Playing
            || slot.room.game_phase != GamePhase::Decision
        {
            return Err(GameError::WrongPhase("Not in the decision phase"));
        }

        let room = &mut slot.room;
        let (chosen, other) = match choice {
            DecisionChoice::NextRound => {
                (&mut room.next_round_votes, &mut room.ready_to_vote_votes)
            }
            DecisionChoice::ReadyToVote => {
                (&mut room.ready_to_vote_votes, &mut room.next_round_votes)
            }
        };
        other.shift_remove(player_id);
        chosen.insert(player_id.to_string());
        tracing::debug!(
            "Decision votes in room {}: next={} ready={}",
            code,
            room.next_round_votes.len(),
            room.ready_to_vote_votes.len()
        );

        let mut out = Outbox::new();
        self.check_decision_votes(slot, &mut out);
        out.room_update(&slot.room);
        self.dispatch(out).await;
        Ok(())
    }

    /// Resolve the decision phase as soon as one side has a majority, or
    /// everyone has voted
    pub(super) fn check_decision_votes(&self, slot: &mut RoomSlot, out: &mut Outbox) {
        let room = &slot.room;
        if room.game_state != GameState::Playing || room.game_phase != GamePhase::Decision {
            return;
        }
        let total = room.players.len();
        if total == 0 {
            return;
        }

        let majority = total.div_ceil(2);
        let next = room.next_round_votes.len();
        let ready = room.ready_to_vote_votes.len();

        let choice = if next >= majority {
            DecisionChoice::NextRound
        } else if ready >= majority {
            DecisionChoice::ReadyToVote
        } else if next + ready >= total {
            // Everyone voted without a majority: plurality, ties go to voting
            if ready >= next {
                DecisionChoice::ReadyToVote
            } else {
                DecisionChoice::NextRound
            }
        } else {
            return;
        };

        tracing::info!(
            "Room {} decided {:?} ({} next / {} ready of {})",
            room.code,
            choice,
            next,
            ready,
            total
        );
        match choice {
            DecisionChoice::NextRound => self.advance_to_next_round(slot, out),
            DecisionChoice::ReadyToVote => self.enter_voting(slot, out),
        }
    }

    /// Cast (or change) a vote against a suspected impostor
    pub async fn submit_vote(&self, code: &str, voter_id: &str, suspect_id: &str) -> GameResult<()> {
        let mut rooms = self.rooms.write().await;
        let slot = rooms.get_mut(code).ok_or(GameError::RoomNotFound)?;
        require_player(&slot.room, voter_id)?;
        if slot.room.game_state != GameState::Voting {
            return Err(GameError::WrongPhase("Voting is not open"));
        }
        if slot.room.player(suspect_id).is_none() {
            return Err(GameError::SuspectNotFound);
        }

        slot.room
            .votes
            .insert(voter_id.to_string(), suspect_id.to_string());
        tracing::debug!(
            "Vote in room {} ({}/{})",
            code,
            slot.room.votes.len(),
            slot.room.players.len()
        );

        let mut out = Outbox::new();
        self.check_all_votes_submitted(slot, &mut out);
        out.room_update(&slot.room);
        self.dispatch(out).await;
        Ok(())
    }

    pub(super) fn check_all_votes_submitted(&self, slot: &mut RoomSlot, out: &mut Outbox) {
        let room = &slot.room;
        if room.game_state != GameState::Voting {
            return;
        }
        let all_in = !room.players.is_empty()
            && room.players.iter().all(|p| room.votes.contains_key(&p.id));

        if all_in {
            tracing::info!("All votes in for room {}, tallying early", room.code);
            self.resolve_voting(slot, out);
        }
    }

    /// Close the elimination vote. A caught impostor gets one last guess,
    /// otherwise the game is over.
    pub(super) fn resolve_voting(&self, slot: &mut RoomSlot, out: &mut Outbox) {
        if slot.room.game_state != GameState::Voting {
            return;
        }
        slot.clear_timer();

        let results = tabulate(&slot.room);
        slot.last_results = Some(results.clone());
        tracing::info!(
            "Room {} vote: {:?} voted out, impostor caught: {}",
            slot.room.code,
            results.most_voted_player.as_ref().map(|p| &p.name),
            results.impostor_caught
        );

        if !results.impostor_caught {
            self.finish_game(slot, None, None, Winners::Impostor, out);
            return;
        }

        slot.room.game_state = GameState::FinalGuess;
        out.to_room(&slot.room, ServerMessage::VotingResults(results.clone()));
        if let Some(impostor) = &results.impostor {
            out.to_player(
                &impostor.id,
                ServerMessage::FinalGuessPrompt {
                    secret_word: results.secret_word.clone(),
                    time_limit: self.config.final_guess_seconds,
                },
            );
        }
        self.schedule_final_guess_timeout(slot);
    }
}

/// Count the elimination votes. The most voted player is the first suspect
/// holding the highest count; later suspects need strictly more votes.
pub fn tabulate(room: &Room) -> VotingResults {
    let mut vote_counts: IndexMap<PlayerId, u32> = IndexMap::new();
    let mut voter_names: IndexMap<PlayerId, Vec<String>> = IndexMap::new();

    for (voter, suspect) in &room.votes {
        *vote_counts.entry(suspect.clone()).or_insert(0) += 1;
        let name = room
            .player(voter)
            .map(|p| p.name.clone())
            .unwrap_or_else(|| "Unknown".to_string());
        voter_names.entry(suspect.clone()).or_default().push(name);
    }

    let mut leader: Option<(&PlayerId, u32)> = None;
    for (suspect, count) in &vote_counts {
        if leader.map_or(true, |(_, best)| *count > best) {
            leader = Some((suspect, *count));
        }
    }

    let most_voted_player = leader
        .and_then(|(id, _)| room.player(id))
        .map(|p| VotedPlayer {
            id: p.id.clone(),
            name: p.name.clone(),
            is_impostor: p.is_impostor,
        });
    let impostor_caught = most_voted_player
        .as_ref()
        .is_some_and(|p| p.is_impostor);

    VotingResults {
        vote_counts,
        voter_names,
        most_voted_player,
        impostor: room.impostor().map(|p| ImpostorInfo {
            id: p.id.clone(),
            name: p.name.clone(),
        }),
        impostor_caught,
        secret_word: room.secret_word.clone().unwrap_or_default(),
        category: room.category.clone().unwrap_or_default(),
    }
}
