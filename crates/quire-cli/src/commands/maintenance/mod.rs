mod maintain;
mod status;
mod unlock;

pub use maintain::handle_maintain;
pub use status::handle_status;
pub use unlock::handle_unlock;
