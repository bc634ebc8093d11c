pub mod api;
pub mod bus;
pub mod config;
pub mod db;
pub mod motor;
pub mod predictions;
pub mod sensors;
