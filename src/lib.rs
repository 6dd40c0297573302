//! spamflow: Spam Classification Pipeline Library
//!
//! A five-stage pipeline that turns a labeled SMS dataset into a trained
//! random forest and its test metrics: ingestion, text preprocessing,
//! TF-IDF feature engineering, model building and evaluation.

pub mod cli;
pub mod error;
pub mod pipeline;
pub mod report;
pub mod utils;
