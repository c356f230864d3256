//! Per-connection channel state machines.
//!
//! Nothing in here touches a socket: the transport tasks feed datagrams in
//! and write whatever comes out. Send-direction state lives in
//! [`OutboundSession`], receive-direction state in [`InboundSession`], so the
//! write task and the read task never share mutable state.

pub mod inbound;
pub mod outbound;
pub mod reliable;
pub mod unreliable;

pub use inbound::{Inbound, InboundSession};
pub use outbound::OutboundSession;
pub use reliable::{AckOutcome, DataOutcome, SendState};
