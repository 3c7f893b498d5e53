//! Event Quality & Impact Score: six per-event sub-scores composed with
//! configured weights, persisted one row per event.

pub mod tfidf;

mod computer;

pub(crate) use computer::EqisComputer;
