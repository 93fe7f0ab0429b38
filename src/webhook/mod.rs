//! Webhook task dispatch.
//!
//! ## Module Map
//!
//! ```text
//! ┌──────────┐  POST /webhook  ┌──────────────────────────────────────────────┐
//! │  Caller  │ ──────────────> │  server.rs   (axum Router, AppState)         │
//! │ (CI, VCS)│ <────────────── │    └─ auth.rs  (secret header middleware)    │
//! └──────────┘   JSON result   │         │                                    │
//!                              │         v                                    │
//!                              │  dispatcher.rs  (per-request pipeline)       │
//!                              │    ├─ payload.rs   decode + validate         │
//!                              │    ├─ resolver.rs  named / fixed task        │
//!                              │    ├─ sync.rs      git checkout -f + pull    │
//!                              │    └─ executor.rs  run task, capture output  │
//!                              │         │                                    │
//!                              │         v                                    │
//!                              │  runner.rs  (CommandRunner → sh -c)          │
//!                              │                                              │
//!                              │  response.rs  (outcome → status + JSON)      │
//!                              └──────────────────────────────────────────────┘
//! ```
//!
//! Each request runs the stages strictly in order and stops at the first
//! failure. Nothing is shared between requests except the immutable
//! [`Config`](crate::config::Config). There is no queue and no concurrency
//! limit: simultaneous deliveries spawn simultaneous processes, and a task
//! that never exits holds its request open unless `task_timeout_secs` is set.

pub mod auth;
pub mod dispatcher;
pub mod executor;
pub mod payload;
pub mod resolver;
pub mod response;
pub mod runner;
pub mod server;
pub mod sync;
