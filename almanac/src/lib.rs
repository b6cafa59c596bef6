//! Cached, LLM-generated interpretations for a person's annual astrological
//! calendar.
//!
//! A solar cycle runs from one birthday to the next. Its events come from a
//! chart provider, each event gets a stable identity, and interpretations are
//! generated in bounded batches into a TTL cache that the calendar exporter
//! and the HTTP API read from.

pub mod api;
pub mod calendar;
pub mod chart;
pub mod clock;
pub mod config;
pub mod cycle;
pub mod db;
pub mod error;
pub mod interpretation;
pub mod llm;
pub mod models;
pub mod services;
