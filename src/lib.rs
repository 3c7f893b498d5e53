#![warn(clippy::all, clippy::pedantic)]
#![allow(
    // Acceptable for trait naming consistency (e.g., StoreDao, StoreDaoImpl)
    clippy::module_name_repetitions,

    // Score math mixes integer counts and f64 ratios throughout
    clippy::cast_precision_loss,

    // Row counts and batch sizes convert between usize and i64 at the DB boundary
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_sign_loss,

    // Domain logic often requires helper declarations mid-function for readability
    clippy::items_after_statements,

    // Error context via anyhow::Context already provides sufficient documentation
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,

    // Technical identifiers (TF-IDF, XXH3, EQIS) don't need markdown formatting
    clippy::doc_markdown,

    clippy::uninlined_format_args,
    clippy::option_if_let_else,
    clippy::needless_pass_by_value,
    clippy::must_use_candidate,
    clippy::collapsible_if,
    clippy::explicit_iter_loop
)]

pub mod analysis;
pub(crate) mod api;
pub mod app;
pub mod cleanup;
pub mod config;
pub mod eqis;
pub mod grouping;
pub mod health;
pub mod ingest;
pub mod observability;
pub(crate) mod store;
pub mod util;
pub mod worker;
