//! Board Authorization Server
//!
//! Role hierarchies for platform and board permissions, plus per-caller rate
//! limiting over a shared counter store.
//!
//! ```
//! use kb_server::roles::{can_remove_board_member, BoardRole};
//!
//! assert!(BoardRole::Admin > BoardRole::Member);
//! let decision = can_remove_board_member("admin", "member", false).unwrap();
//! assert!(decision.is_allowed());
//! ```

pub mod api;
pub mod auth;
pub mod config;
pub mod ratelimit;
pub mod roles;
