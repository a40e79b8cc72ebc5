pub mod audit_service_errors;
pub mod award_service_errors;
