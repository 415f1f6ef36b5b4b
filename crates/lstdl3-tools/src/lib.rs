//! Command line front end for the `lstdl3` crate.

pub mod cli;
pub mod commands;
pub mod info;
