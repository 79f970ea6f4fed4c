// Vote state machine - pure, no side effects
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::db::models::InvalidColumn;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DealId(pub String);

impl DealId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DealId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Direction of a stored vote row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteType {
    Up,
    Down,
}

impl VoteType {
    pub fn as_str(&self) -> &'static str {
        match self {
            VoteType::Up => "up",
            VoteType::Down => "down",
        }
    }
}

impl fmt::Display for VoteType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VoteType {
    type Err = InvalidColumn;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "up" => Ok(VoteType::Up),
            "down" => Ok(VoteType::Down),
            other => Err(InvalidColumn::new("vote_type", other)),
        }
    }
}

/// What the user clicked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteAction {
    CastUp,
    CastDown,
}

impl VoteAction {
    pub fn direction(&self) -> VoteType {
        match self {
            VoteAction::CastUp => VoteType::Up,
            VoteAction::CastDown => VoteType::Down,
        }
    }
}

impl From<VoteType> for VoteAction {
    fn from(direction: VoteType) -> Self {
        match direction {
            VoteType::Up => VoteAction::CastUp,
            VoteType::Down => VoteAction::CastDown,
        }
    }
}

/// The viewing user's stance on one deal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum VoteState {
    #[default]
    NoVote,
    VotedUp,
    VotedDown,
}

/// The single write a transition needs against the vote store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteWrite {
    Insert(VoteType),
    Update(VoteType),
    Delete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CounterDelta {
    pub upvotes: i64,
    pub downvotes: i64,
}

impl CounterDelta {
    fn of(direction: VoteType, amount: i64) -> Self {
        match direction {
            VoteType::Up => Self {
                upvotes: amount,
                downvotes: 0,
            },
            VoteType::Down => Self {
                upvotes: 0,
                downvotes: amount,
            },
        }
    }

    fn plus(self, other: Self) -> Self {
        Self {
            upvotes: self.upvotes + other.upvotes,
            downvotes: self.downvotes + other.downvotes,
        }
    }
}

/// Displayed up/down counts. Plain integers, no floor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VoteCounters {
    pub upvotes: i64,
    pub downvotes: i64,
}

impl VoteCounters {
    pub fn new(upvotes: i64, downvotes: i64) -> Self {
        Self { upvotes, downvotes }
    }

    pub fn apply(&mut self, delta: CounterDelta) {
        self.upvotes += delta.upvotes;
        self.downvotes += delta.downvotes;
    }

    pub fn revert(&mut self, delta: CounterDelta) {
        self.upvotes -= delta.upvotes;
        self.downvotes -= delta.downvotes;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: VoteState,
    pub to: VoteState,
    pub write: VoteWrite,
    pub delta: CounterDelta,
}

impl VoteState {
    pub fn from_row(row: Option<VoteType>) -> Self {
        match row {
            None => Self::NoVote,
            Some(VoteType::Up) => Self::VotedUp,
            Some(VoteType::Down) => Self::VotedDown,
        }
    }

    /// The vote row this state corresponds to, if any.
    pub fn vote_type(&self) -> Option<VoteType> {
        match self {
            Self::NoVote => None,
            Self::VotedUp => Some(VoteType::Up),
            Self::VotedDown => Some(VoteType::Down),
        }
    }

    pub fn state_name(&self) -> &'static str {
        match self {
            Self::NoVote => "NoVote",
            Self::VotedUp => "VotedUp",
            Self::VotedDown => "VotedDown",
        }
    }

    /// Decide the minimal change for a click.
    ///
    /// Clicking the current direction retracts the vote, clicking the other
    /// direction flips it, and clicking from `NoVote` creates it.
    pub fn transition(self, action: VoteAction) -> Transition {
        let direction = action.direction();
        let (to, write, delta) = match self.vote_type() {
            None => (
                Self::from_row(Some(direction)),
                VoteWrite::Insert(direction),
                CounterDelta::of(direction, 1),
            ),
            Some(current) if current == direction => (
                Self::NoVote,
                VoteWrite::Delete,
                CounterDelta::of(direction, -1),
            ),
            Some(current) => (
                Self::from_row(Some(direction)),
                VoteWrite::Update(direction),
                CounterDelta::of(current, -1).plus(CounterDelta::of(direction, 1)),
            ),
        };

        Transition {
            from: self,
            to,
            write,
            delta,
        }
    }
}
