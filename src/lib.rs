// Library root: the storage bridge engine and its configuration

pub mod config;
pub mod engine;
