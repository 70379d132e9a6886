pub mod channel;
pub mod connection;
