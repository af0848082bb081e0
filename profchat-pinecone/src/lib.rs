//! Pinecone vector index client for profchat.
//!
//! This crate provides a query-only `PineconeIndex` that implements
//! `profchat_core::VectorIndex` over Pinecone's data-plane HTTP API.
//! Index population happens out of band.
//!
//! Environment variables read by the `*_from_env` builder helpers:
//! - `PINECONE_API_KEY`
//! - `PINECONE_BASE_URL` (the index host, e.g. `https://rag-abc123.svc.pinecone.io`)
//! - `PINECONE_NAMESPACE` (optional)

pub mod client;
mod config;
mod error;
mod index;
pub mod mapper;
mod types;

pub use config::PineconeIndexBuilder;
pub use error::PineconeError;
pub use index::PineconeIndex;
