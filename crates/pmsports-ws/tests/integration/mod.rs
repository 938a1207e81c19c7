//! Integration test support for pmsports-ws.

pub mod common;
