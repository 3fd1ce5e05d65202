//! Demonstration workflows run by the `stepgraph` binary.
//!
//! - [`chat`]: greets, inspects the user's request and branches on a `bool`
//!   label to either tell a joke or ask for clarification.
//! - [`exchange`]: a linear extraction pipeline over a customer remittance
//!   file that branches on the detected operation modality using run-time
//!   string labels.
//!
//! Both build their graph inside a function; nothing is global.

pub mod chat;
pub mod exchange;
