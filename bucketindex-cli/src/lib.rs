pub mod backend;
pub mod config;
pub mod enumerate;
pub mod fanout;
pub mod template;
