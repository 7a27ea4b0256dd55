//! Per-link HDLC engine.
//!
//! A link pairs one transmit ring with one inbound decoder. Any number of
//! [`LinkSender`] clones queue frames; a drain worker (a thread, a tokio task
//! or the caller itself) moves queued bytes onto the transport. A single
//! [`LinkReceiver`] decodes inbound bytes, acknowledges information frames and
//! dispatches the rest to a [`ChannelHandler`].

pub mod config;
pub mod error;
pub mod handler;
pub mod link;
pub mod pump;
pub mod receiver;
pub mod sender;
pub mod stats;
pub mod worker;

#[cfg(feature = "async")]
pub mod drain_task;

pub use config::LinkConfig;
pub use error::{LinkError, Result};
pub use handler::ChannelHandler;
pub use link::{manual, Link};
pub use pump::pump;
pub use receiver::LinkReceiver;
pub use sender::{DrainScheduler, LinkSender, ManualDrain};
pub use stats::LinkStats;
pub use worker::TxWorker;

#[cfg(feature = "async")]
pub use drain_task::DrainTask;
#[cfg(feature = "async")]
pub use link::spawn_async;
