pub mod award_repository_errors;
pub mod booking_repository_errors;
pub mod game_repository_errors;
pub mod user_repository_errors;
