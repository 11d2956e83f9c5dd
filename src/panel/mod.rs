//! Call board: a phone-number list with a "call all" button and a live status feed.
//!
//! ## Module Map
//!
//! ```text
//! ┌──────────┐   HTTP   ┌──────────────────────────────────────────────────┐
//! │ Browser  │ ───────> │  server.rs  (axum Router, ServerConfig)          │
//! │          │ <─────── │    └─ api.rs  (route handlers, AppState)         │
//! └──────────┘   SSE    │         │                │                       │
//!                       │         │ start_batch()  │ stream(batch)         │
//!                       │         v                v                       │
//!                       │  dialer.rs (Dialer)  relay.rs (StatusRelay)      │
//!                       │         │                                        │
//!                       │         │ CallProvider::create_call()            │
//!                       │         v                                        │
//!                       │  provider.rs  (TwilioClient)                     │
//!                       │                                                  │
//!                       │  store.rs  (StoreHandle over numbers.txt)        │
//!                       └──────────────────────────────────────────────────┘
//! ```
//!
//! ## Batches
//!
//! `POST /call_all` snapshots the list and dials it in the background, one
//! number at a time with a fixed pause between calls. Every batch gets its own
//! status feed; a number is only removed from the file after its call was
//! accepted by the provider. A number already being dialed by another batch is
//! skipped.

pub mod api;
pub mod dialer;
pub mod embedded;
pub mod models;
pub mod page;
pub mod provider;
pub mod relay;
pub mod server;
pub mod store;
