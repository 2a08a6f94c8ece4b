//! One participant's view of a match
//!
//! The server only relays coordinates, so each participant keeps its own
//! [`BoardEngine`] and feeds it both its own moves and the relayed ones.
//! A display adapter renders from this model and never keeps rule state of
//! its own.

use crate::board::{describe_move, describe_win, BoardEngine, Position, Stone, WinResult};
use crate::error::GameError;
use crate::protocol::{ClientMessage, ServerMessage};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// How a match finished, from this participant's point of view
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchOutcome {
    /// A line of five was completed on our board
    Won(WinResult),
    /// The peer disconnected
    EndedByPeer,
    /// We ended the match ourselves
    EndedLocally,
}

/// What changed after applying a server message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParticipantUpdate {
    Started { colour: Stone, our_turn: bool },
    StonePlaced {
        stone: Stone,
        position: Position,
        win: Option<WinResult>,
    },
    EndedByPeer,
    Rejected { reason: String },
}

/// Participant-side match state
#[derive(Debug, Clone, Default)]
pub struct ParticipantMatch {
    board: BoardEngine,
    colour: Option<Stone>,
    our_turn: bool,
    outcome: Option<MatchOutcome>,
    transcript: Vec<String>,
}

impl ParticipantMatch {
    /// A participant waiting for its match to start
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one message received from the server
    pub fn apply(&mut self, message: ServerMessage) -> Result<ParticipantUpdate, GameError> {
        match message {
            ServerMessage::MatchStarted { goes_first } => self.start(goes_first),
            ServerMessage::OpponentMoved { row, col } => {
                let colour = self.colour.ok_or(GameError::NotInMatch)?;
                self.place(row, col, colour.opponent())
            }
            ServerMessage::MatchEndedByPeer => {
                if self.outcome.is_none() {
                    self.outcome = Some(MatchOutcome::EndedByPeer);
                }
                self.our_turn = false;
                self.transcript
                    .push("The game ended for another reason.".to_string());
                info!("Match ended by peer");
                Ok(ParticipantUpdate::EndedByPeer)
            }
            ServerMessage::Rejected { reason } => {
                debug!("Server rejected request: {}", reason);
                Ok(ParticipantUpdate::Rejected { reason })
            }
        }
    }

    /// Place our own stone and produce the message announcing it.
    ///
    /// The stone lands on our board before the server ever sees it.
    pub fn place_local(&mut self, row: i32, col: i32) -> Result<ClientMessage, GameError> {
        let colour = self.colour.ok_or(GameError::NotInMatch)?;
        if self.outcome.is_some() {
            return Err(GameError::GameAlreadyOver);
        }
        if !self.our_turn {
            return Err(GameError::NotYourTurn);
        }

        self.place(row, col, colour)?;
        Ok(ClientMessage::MovePlaced { row, col })
    }

    /// Leave the match voluntarily
    pub fn end(&mut self) -> ClientMessage {
        if self.outcome.is_none() {
            self.outcome = Some(MatchOutcome::EndedLocally);
        }
        self.our_turn = false;
        ClientMessage::EndMatch
    }

    fn start(&mut self, goes_first: bool) -> Result<ParticipantUpdate, GameError> {
        if self.colour.is_some() {
            return Err(GameError::InvalidMessage {
                reason: "match already started".to_string(),
            });
        }

        // The first mover plays Black
        let colour = if goes_first { Stone::Black } else { Stone::White };
        self.colour = Some(colour);
        self.our_turn = goes_first;
        self.transcript.push(format!(
            "Match started: we play {}, {} moves first",
            colour,
            if goes_first { "we" } else { "opponent" }
        ));

        Ok(ParticipantUpdate::Started {
            colour,
            our_turn: goes_first,
        })
    }

    fn place(&mut self, row: i32, col: i32, stone: Stone) -> Result<ParticipantUpdate, GameError> {
        if self.outcome.is_some() {
            return Err(GameError::GameAlreadyOver);
        }

        let win = self.board.place_stone(row, col, stone)?;
        let position = Position::try_new(row, col)?;
        self.transcript.push(describe_move(stone, position));
        self.our_turn = !self.our_turn;

        if let Some(win) = &win {
            self.transcript.push(describe_win(win));
            self.outcome = Some(MatchOutcome::Won(win.clone()));
            self.our_turn = false;
            info!("{} won the match", win.winner);
        }

        Ok(ParticipantUpdate::StonePlaced {
            stone,
            position,
            win,
        })
    }

    /// Our colour once the match has started
    pub fn colour(&self) -> Option<Stone> {
        self.colour
    }

    pub fn is_started(&self) -> bool {
        self.colour.is_some()
    }

    pub fn is_our_turn(&self) -> bool {
        self.our_turn && self.outcome.is_none()
    }

    pub fn is_over(&self) -> bool {
        self.outcome.is_some()
    }

    pub fn outcome(&self) -> Option<&MatchOutcome> {
        self.outcome.as_ref()
    }

    /// Read-only board for rendering
    pub fn board(&self) -> &BoardEngine {
        &self.board
    }

    /// Human-readable log of the match so far
    pub fn transcript(&self) -> &[String] {
        &self.transcript
    }
}
