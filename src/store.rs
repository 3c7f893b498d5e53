pub(crate) mod dao;
pub(crate) mod error;
pub(crate) mod models;
