#[macro_use]
extern crate log;
#[macro_use]
extern crate derive_builder;
#[macro_use]
extern crate lazy_static;

pub mod browser_controller;
pub mod config;
pub mod directory;
pub mod download;
pub mod extract;
pub mod input;
pub mod metadata;
pub mod runner;
pub mod types;
pub mod utils;
