//! JSON-over-stdio action surface for the filesmith engine.
//!
//! One request object per line on stdin, one response object per line on
//! stdout. Requests deserialize into the closed [`Request`] enum; every
//! response is an envelope carrying `success` plus either the operation's
//! payload fields or an `error` message. A line that does not parse is
//! answered like any other failure and the loop keeps serving.

mod action;
mod service;
mod stdio;

pub use action::Request;
pub use service::Service;
pub use stdio::serve;
