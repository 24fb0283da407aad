#![forbid(unsafe_code)]

pub mod quiz_file;
pub mod repository;
pub mod sqlite;
