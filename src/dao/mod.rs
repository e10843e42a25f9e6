/// Room state storage and retrieval operations.
pub mod room_store;
/// Storage abstraction layer shared by room store backends.
pub mod storage;
/// Binary-question catalog the rounds draw from.
pub mod questions;
