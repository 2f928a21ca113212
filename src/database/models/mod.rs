pub mod platform_account;

pub use platform_account::PlatformAccountEntity;
