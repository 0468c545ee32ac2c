mod context;
mod identity;

pub use context::AuthContext;
pub use identity::Identity;
