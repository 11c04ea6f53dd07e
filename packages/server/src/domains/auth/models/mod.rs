pub mod account;
pub mod identifier;

pub use account::{Account, NewAccount, Role, ACCOUNTS_EMAIL_KEY, ACCOUNTS_PHONE_KEY};
pub use identifier::{is_super_admin_identifier, normalize_email, normalize_phone};
