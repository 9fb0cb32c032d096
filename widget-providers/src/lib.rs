pub mod convex;
pub mod parse;
pub mod request;
pub mod runtime;
