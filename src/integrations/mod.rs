pub mod response;
pub mod rtm;
