pub mod remove;

pub use remove::execute_remove;
