use crate::conversation_state::CallFlow;

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Where a call is in the slot-filling conversation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallState {
    Entry,
    CollectName,
    CollectPhone,
    CollectTime,
    Confirm,
    Booked,
    Abandoned,
    DuplicateRejected,
}

impl CallState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            CallState::Booked | CallState::Abandoned | CallState::DuplicateRejected
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CallState::Entry => "entry",
            CallState::CollectName => "collect_name",
            CallState::CollectPhone => "collect_phone",
            CallState::CollectTime => "collect_time",
            CallState::Confirm => "confirm",
            CallState::Booked => "booked",
            CallState::Abandoned => "abandoned",
            CallState::DuplicateRejected => "duplicate_rejected",
        }
    }

    /// The slot a collecting state is waiting on.
    pub fn slot(self) -> Option<Slot> {
        match self {
            CallState::CollectName => Some(Slot::Name),
            CallState::CollectPhone => Some(Slot::Phone),
            CallState::CollectTime => Some(Slot::Time),
            CallState::Confirm => Some(Slot::Confirm),
            _ => None,
        }
    }
}

impl fmt::Display for CallState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Keys for `attempt_counts`.  `Confirm` is not a slot value but it is retried the same way.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Slot {
    Name,
    Phone,
    Time,
    Confirm,
}

/// Collected values.  Each is either absent or already validated by its extractor.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slots {
    pub name: Option<String>,
    /// E.164
    pub phone: Option<String>,
    pub starts_at: Option<DateTime<FixedOffset>>,
    pub duration_minutes: Option<u32>,
}

/// Durable per-call conversation state, owned by the call flow and kept in the session store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallSession {
    pub call_id: String,
    pub state: CallState,
    pub caller_phone: Option<String>,
    pub slots: Slots,
    pub attempt_counts: BTreeMap<Slot, u32>,
    /// Turns processed so far; prompts carry it back so replays can be told apart.
    pub turn_seq: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub is_test_data: bool,
}

impl CallSession {
    pub fn new(
        call_id: &str,
        caller_phone: Option<String>,
        is_test_data: bool,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            call_id: call_id.to_string(),
            state: CallState::Entry,
            caller_phone,
            slots: Slots::default(),
            attempt_counts: BTreeMap::new(),
            turn_seq: 0,
            created_at: now,
            updated_at: now,
            is_test_data,
        }
    }

    pub fn attempts(&self, slot: Slot) -> u32 {
        self.attempt_counts.get(&slot).copied().unwrap_or(0)
    }

    /// The `(state, turn_seq)` pair a conditional write must still find in the store.
    pub fn revision(&self) -> Revision {
        Revision {
            state: self.state,
            turn_seq: self.turn_seq,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Revision {
    pub state: CallState,
    pub turn_seq: u32,
}

/// Precondition for `SessionStore::put`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Expected {
    /// No live session may exist for the call.
    Absent,
    /// The stored session must still be at this revision.
    At(Revision),
}

/// One inbound conversational turn, already transcribed.
#[derive(Clone, Debug, Default)]
pub struct Turn {
    pub call_id: String,
    pub utterance: Option<String>,
    /// Caller ID as delivered by the carrier; normalized by the call flow.
    pub caller_phone: Option<String>,
    /// The `turn_seq` the answered prompt was issued at; `None` on the call-start webhook.
    pub seq: Option<u32>,
    pub is_test_data: bool,
}

/// What to do with the call after speaking.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NextStep {
    /// Listen for the next utterance, posting back with this sequence number.
    Gather { seq: u32 },
    Hangup,
}

/// What happened on a turn, for logging and tests.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TurnOutcome {
    Advanced,
    Reprompted(crate::extractors::Reason),
    /// A duplicate or stale delivery; nothing was written.
    Replayed,
    Booked(uuid::Uuid),
    Duplicate(uuid::Uuid),
    Abandoned,
    /// The booking transaction kept colliding with another; the caller is asked to reconfirm.
    Contended,
    /// The session could not be read or written; the caller is asked to call back.
    RetryLater,
}

/// The structured directive returned for every turn, rendered to TwiML by the handler.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Reply {
    pub say: String,
    pub next: NextStep,
    /// State after the turn; `None` when the session store could not be reached.
    pub state: Option<CallState>,
    pub outcome: TurnOutcome,
}

pub struct AppState {
    pub flow: CallFlow,
}
