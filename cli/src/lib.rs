//! stagehand command line host: manifest format, demo stage catalog and the
//! `resolve` / `run` commands.

pub mod commands;
pub mod error;
pub mod host;
pub mod manifest;
pub mod messages;
