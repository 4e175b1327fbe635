//! Canadian university program recommender.
//!
//! The ranking core lives in [`matching`]; [`embedding`] and [`roadmap`] wrap
//! the upstream model providers, and [`web`] exposes everything over HTTP.

pub mod app;
pub mod cli;
pub mod config;
pub mod data;
pub mod embedding;
pub mod logging;
pub mod matching;
pub mod roadmap;
pub mod state;
pub mod utils;
pub mod web;
