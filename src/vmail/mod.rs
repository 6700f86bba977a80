pub mod audit;
pub mod config;
pub mod dates;
pub mod folder;
pub mod greeting;
pub mod info;
pub mod mailbox;
pub mod message;
pub mod paths;
