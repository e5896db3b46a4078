//! Companion Hub: a catalog of AI companion profiles with per-user
//! like/dislike/star interactions, an admin curation area and role-gated
//! navigation.

pub mod catalog;
pub mod db;
pub mod interactions;
pub mod notice;
pub mod routing;
pub mod server;
pub mod services;
pub mod session;
pub mod store;
pub mod version;
pub mod web;
