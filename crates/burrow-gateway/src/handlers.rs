mod health;
mod stats;
mod url;
mod user;

pub use health::ping_handler;
pub use stats::stats_handler;
pub use url::{batch_handler, create_text_handler, redirect_handler, shorten_handler};
pub use user::{delete_user_urls_handler, user_urls_handler};
