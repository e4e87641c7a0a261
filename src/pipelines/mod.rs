pub mod cache;
pub mod model;
pub mod utils;

pub mod aspect;
pub mod emotion;
pub mod sentiment;
