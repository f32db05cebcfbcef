//! Authentication: session lifecycle, cookie capture, and cookie persistence.

mod cookies;
mod session;
mod store;

pub use cookies::{
    CookieRecord, load_records_into_jar, parse_set_cookie, unix_now,
};
pub use session::{CSRF_COOKIE, LetterboxdSession, LoginError};
pub use store::{CookieStore, StoreError};
