pub mod award_repository;
pub mod booking_repository;
pub mod errors;
pub mod game_repository;
#[cfg(any(test, feature = "test-util"))]
pub mod memory;
pub mod offline_booking_repository;
pub mod user_repository;
