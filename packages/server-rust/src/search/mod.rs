//! Search-domain support code: result fusion and pagination cursors.

pub mod fusion;
