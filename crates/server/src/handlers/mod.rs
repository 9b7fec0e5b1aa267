//! HTTP handlers.

pub mod answers;
pub mod domains;
pub mod files;
pub mod health;
pub mod uploads;
pub mod users;

pub use answers::ask;
pub use domains::{create_domain, delete_domain, rename_domain, select_domain};
pub use files::delete_file;
pub use health::health_check;
pub use uploads::{commit_uploads, stage_file, stage_url};
pub use users::{get_user_overview, provision};

use doclink_core::UserId;
use serde::Deserialize;

/// Query parameters carrying the caller's user id.
///
/// Authentication is a transport concern outside this crate; handlers
/// receive the already-resolved user identity.
#[derive(Debug, Deserialize)]
pub struct UserQuery {
    pub user_id: UserId,
}
