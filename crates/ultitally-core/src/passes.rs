// Pass tracker: thrower, then receiver, then a catch, goal, or turnover.
// Every finished throw is kept with its point number until the game is
// saved, when it becomes a throw event row feeding analytics.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::model::Player;
use crate::records::{NewThrowEvent, ThrowResult};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PassError {
    #[error("select a thrower first")]
    NoThrower,

    #[error("select a receiver first")]
    NoReceiver,

    #[error("{0} already has the disc")]
    SamePlayer(String),

    #[error("{receiver} is not on {thrower}'s side")]
    OtherSide { thrower: String, receiver: String },

    #[error("{0} is waiting on a catch, goal, or turnover")]
    ReceiverPending(String),
}

/// A finished throw, not yet tied to a stored game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PassRecord {
    pub thrower_id: String,
    pub receiver_id: Option<String>,
    pub result: ThrowResult,
    pub point_number: u32,
}

impl PassRecord {
    pub fn to_new_event(&self, game_id: &str) -> NewThrowEvent {
        NewThrowEvent {
            game_id: game_id.to_string(),
            thrower_id: self.thrower_id.clone(),
            receiver_id: self.receiver_id.clone(),
            result: self.result,
            point_number: Some(self.point_number),
        }
    }
}

/// What a tracker operation did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PassTransition {
    ThrowerSet(Player),
    ReceiverSet(Player),
    /// The catch was logged and the receiver now holds the disc.
    Completed(PassRecord),
    /// A goal or turnover was logged and the next point began.
    PointEnded(PassRecord),
    Cleared,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PassTracker {
    thrower: Option<Player>,
    receiver: Option<Player>,
    point_number: u32,
    passes: Vec<PassRecord>,
}

impl Default for PassTracker {
    fn default() -> Self {
        PassTracker {
            thrower: None,
            receiver: None,
            point_number: 1,
            passes: Vec::new(),
        }
    }
}

impl PassTracker {
    pub fn thrower(&self) -> Option<&Player> {
        self.thrower.as_ref()
    }

    pub fn receiver(&self) -> Option<&Player> {
        self.receiver.as_ref()
    }

    pub fn point_number(&self) -> u32 {
        self.point_number
    }

    pub fn passes(&self) -> &[PassRecord] {
        &self.passes
    }

    /// A tap on a player. The first tap picks the thrower and the second the
    /// receiver; tapping the receiver again confirms the catch.
    pub fn tap(&mut self, player: Player) -> Result<PassTransition, PassError> {
        if self.thrower.is_none() {
            debug!("thrower: {}", player.name);
            self.thrower = Some(player.clone());
            self.receiver = None;
            return Ok(PassTransition::ThrowerSet(player));
        }
        if let Some(receiver) = &self.receiver {
            if receiver.id == player.id {
                return self.catch();
            }
            return Err(PassError::ReceiverPending(receiver.name.clone()));
        }
        let thrower = self.thrower.as_ref().ok_or(PassError::NoThrower)?;
        if thrower.id == player.id {
            return Err(PassError::SamePlayer(player.name));
        }
        if thrower.team != player.team {
            return Err(PassError::OtherSide {
                thrower: thrower.name.clone(),
                receiver: player.name,
            });
        }
        debug!("receiver: {}", player.name);
        self.receiver = Some(player.clone());
        Ok(PassTransition::ReceiverSet(player))
    }

    /// Log a completion; the receiver becomes the next thrower.
    pub fn catch(&mut self) -> Result<PassTransition, PassError> {
        let thrower = self.thrower.as_ref().ok_or(PassError::NoThrower)?;
        let receiver = self.receiver.take().ok_or(PassError::NoReceiver)?;
        let record = PassRecord {
            thrower_id: thrower.id.clone(),
            receiver_id: Some(receiver.id.clone()),
            result: ThrowResult::Completion,
            point_number: self.point_number,
        };
        debug!("completion: {} to {}", thrower.name, receiver.name);
        self.passes.push(record.clone());
        self.thrower = Some(receiver);
        Ok(PassTransition::Completed(record))
    }

    /// Log a goal from the thrower to the receiver and start the next point.
    pub fn goal(&mut self) -> Result<PassTransition, PassError> {
        let thrower = self.thrower.as_ref().ok_or(PassError::NoThrower)?;
        let receiver = self.receiver.as_ref().ok_or(PassError::NoReceiver)?;
        let record = PassRecord {
            thrower_id: thrower.id.clone(),
            receiver_id: Some(receiver.id.clone()),
            result: ThrowResult::Goal,
            point_number: self.point_number,
        };
        info!("goal: {} to {} (point {})", thrower.name, receiver.name, self.point_number);
        Ok(self.end_point(record))
    }

    /// Log a turnover by the thrower and start the next point. Any receiver
    /// already picked is ignored.
    pub fn turnover(&mut self) -> Result<PassTransition, PassError> {
        let thrower = self.thrower.as_ref().ok_or(PassError::NoThrower)?;
        let record = PassRecord {
            thrower_id: thrower.id.clone(),
            receiver_id: None,
            result: ThrowResult::Turnover,
            point_number: self.point_number,
        };
        info!("turnover by {} (point {})", thrower.name, self.point_number);
        Ok(self.end_point(record))
    }

    /// Step back one selection: the receiver if there is one, else the
    /// thrower. Logged throws are kept.
    pub fn clear(&mut self) -> PassTransition {
        if self.receiver.take().is_none() {
            self.thrower = None;
        }
        PassTransition::Cleared
    }

    fn end_point(&mut self, record: PassRecord) -> PassTransition {
        self.passes.push(record.clone());
        self.point_number += 1;
        self.thrower = None;
        self.receiver = None;
        PassTransition::PointEnded(record)
    }
}
