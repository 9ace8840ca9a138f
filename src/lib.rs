#[macro_use]
pub mod macros;

pub mod api;
pub mod config;
pub mod fs_json_util;
pub mod maimai;
