pub mod article;
pub mod session;

pub use article::*;
pub use session::*;
