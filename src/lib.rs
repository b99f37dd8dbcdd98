//! drawcast - watches a lottery-style draw-history feed and pushes
//! AI-generated predictions to Telegram subscribers.
//!
//! The core is the per-subscriber [`poll::PollLoop`]: registered via
//! `/start`, it fetches the latest results every few seconds, detects a new
//! newest issue through the [`registry::SubscriptionRegistry`], asks the
//! inference service for a prediction and hands the result to the delivery
//! sink. The Telegram surface in [`telegram`] is a thin I/O wrapper around
//! that core.

pub mod cli;
pub mod feed;
pub mod poll;
pub mod predictor;
pub mod registry;
pub mod telegram;
pub mod utils;
