pub mod session;
pub mod user;
pub mod web;

pub use session::*;
pub use user::*;
pub use web::*;
