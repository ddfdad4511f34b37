//! Service Layer
//!
//! Business logic that sits between the request handlers and storage.

pub mod explore_service;

pub use explore_service::ExploreService;
