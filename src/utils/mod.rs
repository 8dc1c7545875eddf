pub mod fatal;
pub mod logging;
pub mod markup;
pub mod validation;
