pub mod backend;
pub mod output;
