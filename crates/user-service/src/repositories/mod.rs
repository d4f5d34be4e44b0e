//! Storage collaborators: users in PostgreSQL, sessions in Redis.

pub mod sessions;
pub mod users;

pub use sessions::{InMemorySessionRegistry, RedisSessionRegistry, SessionRegistry};
pub use users::{
    InMemoryUserRepository, NewUser, PgUserRepository, User, UserChanges, UserRepository,
};
