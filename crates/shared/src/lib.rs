//! Wire and domain types shared by the order desk crates.

pub mod domain;
pub mod error;
pub mod protocol;
