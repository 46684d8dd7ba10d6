//! Client of the squeezebox server command line protocol.
//!
//! Every request is a single line `<player> <field> ?` answered by a single
//! line echoing the request with the percent-encoded value in place of `?`.

pub mod decode;
pub mod error;
pub mod field;
pub mod metadata;
pub mod notification;
pub mod server;
pub mod session;

#[cfg(test)]
pub(crate) mod testing;
