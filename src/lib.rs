//! # Raggedy
//!
//! A retrieval-augmented chat pipeline over document trees.
//!
//! Raggedy crawls a document tree (local or remote), embeds the documents
//! into a vector index, caches that index with TTL expiry, and drives
//! multi-turn chat sessions whose prompts are augmented with the nearest
//! documents to each user turn.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌──────────────┐   ┌───────────────┐
//! │   Source    │──▶│  IndexCache  │──▶│   Retriever    │
//! │  FS/Remote  │   │ crawl+embed  │   │ cosine top-k  │
//! └─────────────┘   └──────────────┘   └──────┬────────┘
//!                                             │
//!                    ┌────────────────────────┤
//!                    ▼                        ▼
//!              ┌───────────┐           ┌────────────┐
//!              │ Assembler │──context──▶│  Session   │──▶ chat endpoint
//!              └───────────┘           └────────────┘
//! ```
//!
//! The index is an immutable snapshot shared by all sessions; only the
//! build step takes a lock, and at most one rebuild runs at a time no
//! matter how many sessions observe an expired cache together.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`error`] | Typed error taxonomy |
//! | [`source`] | Document sources (filesystem, remote tree) |
//! | [`embedding`] | Embedding provider abstraction |
//! | [`index`] | Index snapshots and the TTL build cache |
//! | [`retrieve`] | Nearest-neighbor search |
//! | [`context`] | Bounded context assembly |
//! | [`chat`] | Chat completion client |
//! | [`session`] | Sessions, session store, and the chat pipeline |

pub mod chat;
pub mod config;
pub mod context;
pub mod embedding;
pub mod error;
pub mod index;
pub mod models;
pub mod retrieve;
pub mod session;
pub mod source;
