//! CLI command implementations.
//!
//! | Module   | Commands handled |
//! |----------|------------------|
//! | `group`  | `Group`          |
//! | `parse`  | `Parse`          |
//! | `marker` | `Marker`         |
//! | `config` | `Config`         |

pub mod config;
pub mod group;
pub mod marker;
pub mod parse;

pub use config::cmd_config;
pub use group::cmd_group;
pub use marker::cmd_marker;
pub use parse::cmd_parse;
