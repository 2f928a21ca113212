mod handler;
mod model;

pub use handler::{get_accounts, get_stats, save_accounts};
pub use model::{AccountEntry, AccountsResponse, SaveAccountsRequest, SaveAccountsResponse};
