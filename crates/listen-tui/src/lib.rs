//! `listen` — a terminal client for the listen.moe radio streams.
//!
//! Plays the stream through an external media engine and shows what is on
//! air, fed by the station's push gateway.

pub mod action;
pub mod app;
pub mod components;
pub mod gateway;
pub mod player;
pub mod render;
pub mod screen;
pub mod state;
pub mod theme;
