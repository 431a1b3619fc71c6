pub mod models;
pub mod race_store;

pub use race_store::{RaceStore, SqliteRaceStore};
