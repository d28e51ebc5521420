pub mod accounts;
pub mod ssh;
