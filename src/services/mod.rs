pub mod access_control;
pub mod account_service;
pub mod auth_service;
pub mod ledger_service;
pub mod token_service;
