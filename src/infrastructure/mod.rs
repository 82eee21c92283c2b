pub mod database;
pub mod jobs;
pub mod network;
pub mod offline;
