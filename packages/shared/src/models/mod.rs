pub mod award;
pub mod booking;
pub mod game;
pub mod offline_booking;
pub mod user;
