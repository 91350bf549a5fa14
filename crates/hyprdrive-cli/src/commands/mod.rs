pub mod action;
pub mod daemon;
pub mod kill;
pub mod list;
pub mod reload;
pub mod status;
