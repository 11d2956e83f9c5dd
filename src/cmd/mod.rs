//! CLI command implementations.
//!
//! | Module     | Commands handled          |
//! |------------|---------------------------|
//! | `serve`    | `Serve`                   |
//! | `numbers`  | `List`, `Add`, `Remove`   |
//! | `call`     | `Call`                    |

pub mod call;
pub mod numbers;
pub mod serve;

pub use call::cmd_call;
pub use numbers::{cmd_add, cmd_list, cmd_remove};
pub use serve::cmd_serve;
