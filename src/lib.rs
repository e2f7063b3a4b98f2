pub mod base;
pub mod cluster;
pub mod fabric;
pub mod sim;
pub mod ui;
