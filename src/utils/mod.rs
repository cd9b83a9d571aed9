//! Process startup helpers.

pub mod bootstrap;
