//! Role hierarchy and authorization decisions.
//!
//! Two independent rank hierarchies:
//! - System roles: platform-wide (`SuperAdmin` > `Admin` > `User`)
//! - Board roles: per-board (`owner` > `admin` > `member` > `viewer`)
//!
//! Everything here is a pure function of the roles passed in; the caller is
//! responsible for loading the current user's roles.

pub mod board;
pub mod error;
pub mod hierarchy;
pub mod system;

pub use board::{BoardAction, BoardRole};
pub use error::{RoleError, RoleResult, RoleScope};
pub use hierarchy::*;
pub use system::SystemRole;
