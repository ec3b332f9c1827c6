//! Cookie sessions backed by the `sessions` table; admin membership via `admin_users`.

pub mod accounts;
pub mod cookies;
pub mod password;
pub mod session;

pub use accounts::*;
pub use self::cookies::*;
pub use password::{hash_password, verify_password, MIN_PASSWORD_LENGTH};
pub use session::*;
