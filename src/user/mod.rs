//! Users as seen by the auth core, and their storage.

pub mod cache;
/// User record and its action token slots.
pub mod model;
/// Password hashing seam.
pub mod password;
/// Storage trait and the in-memory store.
pub mod store;

pub use cache::CachedUserStore;
pub use model::{ActionTokenSlot, Provider, Role, User};
pub use password::PasswordHasher;
pub use store::{InMemoryUserStore, UserMutation, UserStore};
