mod catalog;
mod goals;
mod rating;
mod recommendation;

pub use catalog::*;
pub use goals::*;
pub use rating::*;
pub use recommendation::*;
