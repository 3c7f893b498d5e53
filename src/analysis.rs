//! Per-article analyzers: claims, named entities, writing quality,
//! outlet reputation, and the feed-to-agency validator.

pub(crate) mod claims;
pub mod ner;
pub mod readability;
pub(crate) mod reputation;
pub mod sentiment;
pub(crate) mod validator;
pub mod writing;
