pub mod fanout;
pub mod models;
pub mod pricing;
pub mod title;
pub mod utils;
