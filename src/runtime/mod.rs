//! The background runtime: command queues, connection state machine,
//! notification dispatch, and the worker loop that ties them together.

pub mod dispatch;
pub mod queues;
pub mod state;
pub(crate) mod worker;

pub use dispatch::{event_channel, EventSink, NotificationDispatcher};
pub use queues::{command_queue, CommandDrain, CommandQueue};
pub use state::{ConnectionState, ConnectionTarget};

pub(crate) use worker::WorkerHandle;
