mod id;
mod janitor;
mod registry;
mod room;

pub use id::{AlphanumericIdGenerator, IdGenerator, ROOM_ID_LENGTH};
pub use janitor::Janitor;
pub use registry::RoomRegistry;
