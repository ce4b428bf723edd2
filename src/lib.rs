//! # Editorial Import
//!
//! Imports scraper results for notable people and rebuilds each person's
//! editorial summary from the scraper's flat piece list into an ordered
//! content tree with stable identifiers.
//!
//! The reconstruction engine itself lives in the I/O-free
//! [`editorial_core`] crate; this crate adds discovery, parsing, a bounded
//! concurrent import pipeline, a JSON directory store and the `edimport`
//! CLI.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────────────┐   ┌──────────────┐
//! │   Scraper    │──▶│     Pipeline     │──▶│  JSON store  │
//! │ results dir  │   │ parse+reconstruct│   │ summaries/   │
//! └──────────────┘   └──────────────────┘   └──────┬───────┘
//!                                                  │
//!                              ┌───────────────────┤
//!                              ▼                   ▼
//!                        ┌──────────┐       ┌────────────┐
//!                        │   show   │       │   export   │
//!                        │  stats   │       │   (JSON)   │
//!                        └──────────┘       └────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! edimport check --strict      # audit piece lists without writing
//! edimport import              # rebuild and store every summary
//! edimport show Ada_Lovelace   # print one record's outline
//! edimport export --output out/records.json
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Scraper result format, slugs, timestamps |
//! | [`connector_fs`] | Result file discovery |
//! | [`ingest`] | Import pipeline |
//! | [`check`] | Structural audit |
//! | [`store_fs`] | JSON directory store |
//! | [`show`] | Single-record display |
//! | [`export`] | JSON export |
//! | [`stats`] | Store statistics |
//! | [`progress`] | Progress reporting on stderr |

pub mod check;
pub mod config;
pub mod connector_fs;
pub mod export;
pub mod ingest;
pub mod models;
pub mod progress;
pub mod show;
pub mod stats;
pub mod store_fs;
