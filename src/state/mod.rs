// State management module
// SQLite-backed settings store for values that outlive a session

pub mod db;
pub mod queries;
pub mod storage;

pub use db::{init_db, open_db, DbConnection, DbError, DbResult};
pub use queries::{delete_setting, get_api_key, get_setting, set_api_key, set_setting, API_KEY_SETTING};
pub use storage::get_app_data_dir;
