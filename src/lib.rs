pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod export;
pub mod http_client;
pub mod logging;
pub mod matchups;
pub mod period;
pub mod player_stats;
pub mod probability;
pub mod roster;
pub mod schedule;
pub mod table;
