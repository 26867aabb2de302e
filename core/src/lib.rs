//!
//! Ambient services shared by every Tessera crate. Currently this is the logging layer.
//!

extern crate self as tessera_core;

pub mod log;
