//! Core of a personal reference manager: a tolerant parser for bibliographic
//! records and a registry that dispatches URLs to the online source able to
//! supply their metadata and documents.

pub mod config;
pub mod error;
pub mod fetch;
pub mod output;
pub mod parser;
pub mod record;
pub mod sources;
pub mod stage;
