pub mod audit_service;
pub mod award_guard;
pub mod coin_award_service;
pub mod errors;
pub mod reward_policy;
