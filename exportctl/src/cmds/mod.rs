pub use bulk::*;
pub use fetch::*;
pub use list::*;

mod bulk;
mod fetch;
mod list;
