//! Incremental inter-type declaration generator for Java sources.
//!
//! Hand-written Java types are parsed into a round-trip model; metadata
//! providers derive facts and member contributions from them; the merge
//! engine folds those contributions into one companion artifact per
//! governing type. A dependency registry and a metadata cache keep every
//! derived item in step with the sources as they change.

pub mod artifacts;
pub mod commands;
pub mod config;
pub mod diagnostics;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod freshness;
pub mod grammar;
pub mod hasher;
pub mod itd;
pub mod lockfile;
pub mod logging;
pub mod metadata;
pub mod model;
pub mod parser;
pub mod path_resolver;
pub mod project;
pub mod providers;
pub mod watch;
