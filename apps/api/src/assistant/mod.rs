// Assistant edit sessions: tool calls parsed into a closed set and applied
// to an in-memory working document, with suggestion accept/reject and
// stack-based undo for whole-resume modifications. Nothing persists until an
// explicit save.

pub mod handlers;
pub mod session;
pub mod tools;
