pub mod canonical;
pub mod decision;
pub mod handle;
pub mod pattern;
pub mod store;

pub use handle::PolicyHandle;
pub use store::PolicyStore;
