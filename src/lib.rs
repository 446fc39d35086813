//! A filterable place browser that keeps map markers in sync with places
//! enriched from a places service and an encyclopedia.

pub mod api;
pub mod config;
pub mod context;
pub mod enrich;
pub mod filter;
pub mod input;
pub mod map;
pub mod models;
pub mod observable;
pub mod render;
pub mod services;
pub mod sync;
pub mod view_model;
