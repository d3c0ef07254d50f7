pub mod config;
pub mod db;
pub mod domain;
pub mod handlers;
pub mod quiz;
pub mod source;

#[cfg(test)]
mod testing;
