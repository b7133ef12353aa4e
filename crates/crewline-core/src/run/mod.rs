//! Run execution — background tasks, event streams, and human-input
//! correlation.
//!
//! Lifecycle of one run:
//!
//! ```text
//! build_crew ──► start_run ──► background task
//!                   │               │  agent output ──► RunEvent::Log
//!                   │               │  ASK_HUMAN ─────► InputBroker.register
//!                   ▼               │                    + RunEvent::InputRequired
//!               RunHandle           │                    ... blocks ...
//!             (event receiver)      │  POST /api/input ► InputBroker.deliver
//!                                   ▼
//!                        FinalResult | Error (exactly one, always last)
//! ```
//!
//! Events for a run travel over one unbounded FIFO channel; the consumer
//! (the HTTP stream adapter) drains it in emission order and stops when the
//! channel closes after the terminal event.

pub mod broker;
pub mod events;
pub mod supervisor;

pub use broker::InputBroker;
pub use events::{RunEvent, RunLogger};
pub use supervisor::{start_run, RunHandle};
