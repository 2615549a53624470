pub mod build_driver;
pub use build_driver::*;

pub mod cli;

pub mod configuration;
pub use configuration::*;

pub mod controller;
pub use controller::*;

pub mod error_handling;

pub mod process;

pub mod provisioning;

pub mod rendering;
