pub mod account;
pub mod contacts;
pub mod daemon;
pub mod settings;
pub mod status;
pub mod sync;
