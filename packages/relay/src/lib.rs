//! # Cowrite Relay
//!
//! Server-side fan-out for cowrite document rooms.
//!
//! Each open document gets one room; a message from a member is
//! delivered to every other current member. The relay does no work per
//! message beyond room lookup, so many clients emitting concurrently
//! into one room is the only contention it sees. Delivery across
//! batches from different senders is unordered; within one batch, step
//! order is preserved.

pub mod relay;
pub mod room;


pub use relay::Relay;
pub use room::{Room, RoomError, RoomMember, RoomRegistry};
