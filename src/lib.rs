//! docqa: document ingestion and question answering over a vector index.
//!
//! PDF files are extracted to text, split into overlapping chunks,
//! embedded, and stored in a SQLite-backed vector index alongside a
//! document ledger that tracks processing status. Questions are
//! answered by embedding the query, retrieving the nearest chunks, and
//! prompting a chat completion model with the retrieved context.
//!
//! # Modules
//!
//! | Module      | Purpose |
//! |-------------|---------|
//! | [`chunk`]   | Overlapping text splitter with break-point preference |
//! | [`config`]  | TOML configuration loading and validation |
//! | [`db`]      | SQLite pool setup |
//! | [`embedding`] | Embedding provider trait, OpenAI client, vector helpers |
//! | [`error`]   | Error types for each pipeline stage |
//! | [`extract`] | Text extraction from PDF files |
//! | [`index`]   | Vector index trait with SQLite and in-memory backends |
//! | [`ingest`]  | Background ingestion pipeline |
//! | [`ledger`]  | Document metadata and status tracking |
//! | [`logging`] | Tracing subscriber setup |
//! | [`migrate`] | Schema migrations |
//! | [`models`]  | Core data types |
//! | [`query`]   | Retrieval-augmented question answering |
//! | [`server`]  | HTTP API |

pub mod chunk;
pub mod config;
pub mod db;
pub mod embedding;
pub mod error;
pub mod extract;
pub mod index;
pub mod ingest;
pub mod ledger;
pub mod logging;
pub mod migrate;
pub mod models;
pub mod query;
pub mod server;
