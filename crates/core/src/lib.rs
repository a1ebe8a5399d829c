#![deny(warnings)]

pub mod assemble;
pub mod config;
pub mod emotion;
pub mod pipeline;
pub mod progress;
pub mod segment;
pub mod tts;
