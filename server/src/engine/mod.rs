pub mod events;
pub mod notifier;
pub mod room;
pub mod room_engine;
pub mod validation;
