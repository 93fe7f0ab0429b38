//! CLI command implementations.
//!
//! | Module   | Mode                                 |
//! |----------|--------------------------------------|
//! | `check`  | `--check`: validate and summarize    |
//! | `serve`  | default: run the webhook server      |

pub mod check;
pub mod serve;

pub use check::cmd_check;
pub use serve::{cmd_serve, load_config};
