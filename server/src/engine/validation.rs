/// Default maximum message text length (characters).
pub const MAX_MESSAGE_LENGTH: usize = 200;

/// Default maximum username length (characters).
pub const MAX_USERNAME_LENGTH: usize = 32;

/// Default maximum room display name length (characters).
pub const MAX_ROOM_NAME_LENGTH: usize = 100;

/// Input limits applied before any state is touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub max_message_length: usize,
    pub max_username_length: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_message_length: MAX_MESSAGE_LENGTH,
            max_username_length: MAX_USERNAME_LENGTH,
        }
    }
}

/// Validate a display name. Must be non-empty after trimming.
pub fn validate_username(username: &str, max_len: usize) -> Result<(), String> {
    let username = username.trim();
    if username.is_empty() {
        return Err("Username cannot be empty".into());
    }
    if username.chars().count() > max_len {
        return Err(format!("Username too long (max {max_len} characters)"));
    }
    Ok(())
}

/// Validate message text. Must be non-empty after trimming and under the length limit.
pub fn validate_text(text: &str, max_len: usize) -> Result<(), String> {
    let text = text.trim();
    if text.is_empty() {
        return Err("Message cannot be empty".into());
    }
    if text.chars().count() > max_len {
        return Err(format!("Message too long (max {max_len} characters)"));
    }
    Ok(())
}

/// Validate a room display name as given to the create endpoint.
pub fn validate_room_name(name: &str) -> Result<(), String> {
    let name = name.trim();
    if name.is_empty() {
        return Err("Name required".into());
    }
    if name.chars().count() > MAX_ROOM_NAME_LENGTH {
        return Err(format!(
            "Room name too long (max {MAX_ROOM_NAME_LENGTH} characters)"
        ));
    }
    Ok(())
}
