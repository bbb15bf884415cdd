pub mod dispatcher;
pub mod responder;
