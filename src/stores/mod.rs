pub mod accounts_store;

pub use accounts_store::AccountsStore;
