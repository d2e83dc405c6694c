//! Command-line front end for the Graphene host.

pub mod cli;
pub mod commands;
pub mod logging;
