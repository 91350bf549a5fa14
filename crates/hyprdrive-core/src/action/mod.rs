//! Action lookup and the command denylist applied before anything runs

mod blacklist;
mod resolver;

pub use blacklist::{check, Verdict, BLACKLISTED_COMMANDS};
pub use resolver::{resolve, Resolution};
