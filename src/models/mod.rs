mod account;
mod session;
mod transfer;

pub use account::{Account, CreateAccountRequest, DeletedAccount, NewAccount, UpdateAccountRequest};
pub use session::{AuthenticatedAccount, LoginRequest, LoginResponse, SessionClaims};
pub use transfer::{TransferReceipt, TransferRequest};
