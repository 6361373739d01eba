//! Amazon product review analysis: fetch review pages, classify sentiment, mine aspect themes,
//! and compose a narrative summary.

pub mod api;
pub mod config;
pub mod crawler;
pub mod error;
pub mod narrative;
pub mod pipeline;
pub mod product;
pub mod review;
pub mod review_page;
pub mod sentiment;
pub mod stats;
pub mod telemetry;
pub mod themes;
