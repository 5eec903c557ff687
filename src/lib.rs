//! Terminal client for a retrieval-augmented chat backend.
//!
//! The backend exposes `GET /status` for readiness and `POST /chat` for a
//! `text/event-stream` answer. [`core::ReadinessMonitor`] polls the former,
//! [`core::ChatSession`] gates submissions on it and folds the decoded
//! stream from [`stream::drive`] into a [`core::Transcript`].

pub mod backend;
pub mod cli;
pub mod config;
pub mod core;
pub mod logging;
pub mod stream;
pub mod tui;
