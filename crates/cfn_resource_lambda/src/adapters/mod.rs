pub mod context;
pub mod response_sender;
