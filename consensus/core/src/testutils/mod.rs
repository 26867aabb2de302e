pub mod create_transaction;
pub mod scripts;
