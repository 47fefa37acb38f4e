pub mod connection;
mod rows;

pub use connection::{Connection, CreateQuestion, DeleteQuestion, FetchQuestion};
