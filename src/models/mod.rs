//! Data models shared by the proxy and the bucket interface.
//!
//! These records describe object metadata as the store reports it; payload
//! bytes travel separately as chunk streams.

pub mod object;
