pub mod cli;
pub mod copy;
pub mod error;
pub mod history;
pub mod inspect;
pub mod lister;
pub mod parser;
pub mod repl;
pub mod search;
pub mod system;
