//! Messages exchanged between the coordinator and its workers.
//!
//! Workers address the coordinator with one of three tags, and the coordinator answers
//! each `Start` and `Result` with the next task index on [`REPLY_TAG`].

use std::any::Any;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::communication::Tag;

/// Position of an element in the shared sequence.
pub type TaskIndex = usize;

/// Tag of the coordinator's replies, each carrying a [`TaskIndex`].
pub const REPLY_TAG: Tag = 0;

/// The kinds of message a worker sends the coordinator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u64)]
pub enum MapTag {
    /// The worker is ready for its first index. Carries `()`.
    Start = 1,
    /// The worker has exhausted its sequence. Carries `()`.
    Stop = 2,
    /// The worker reports a task. Carries `(TaskIndex, Outcome<R>)`.
    Result = 3,
}

impl From<MapTag> for Tag {
    fn from(tag: MapTag) -> Tag {
        tag as Tag
    }
}

impl TryFrom<Tag> for MapTag {
    /// The unrecognized tag.
    type Error = Tag;
    fn try_from(tag: Tag) -> Result<Self, Tag> {
        match tag {
            1 => Ok(MapTag::Start),
            2 => Ok(MapTag::Stop),
            3 => Ok(MapTag::Result),
            other => Err(other),
        }
    }
}

/// The result of applying the function to one element, as reported by a worker.
pub type Outcome<R> = Result<R, TaskFailure>;

/// A description of a function application that panicked.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskFailure {
    /// The panic message, when the panic carried one.
    pub message: String,
}

impl TaskFailure {
    /// Describes the payload of a caught panic.
    pub fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(text) = payload.downcast_ref::<&'static str>() {
            (*text).to_owned()
        }
        else if let Some(text) = payload.downcast_ref::<String>() {
            text.clone()
        }
        else {
            "panic with a non-string payload".to_owned()
        };
        TaskFailure { message }
    }
}

impl fmt::Display for TaskFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "panicked: {}", self.message)
    }
}
