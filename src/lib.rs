//! # Ground Link Library
//!
//! Ground station telemetry ingestion for XBee-linked rocket avionics.
//!
//! This library provides the live telemetry pipeline: line-oriented
//! frame reassembly over the serial link, field parsing into structured
//! records, primary/redundant sensor reconciliation, threshold and
//! statistical health monitoring, and fan-out delivery to independent
//! consumers.

pub mod config;
pub mod dispatch;
pub mod error;
pub mod frame;
pub mod ingest;
pub mod logstore;
pub mod monitor;
pub mod replay;
pub mod telemetry;
