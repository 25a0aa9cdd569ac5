//! Rooms and their category assignments.

use serde::{Deserialize, Serialize};

use whimsical_frog_core::{CategoryId, RoomAssignmentId};

#[derive(Debug, Clone, Serialize)]
pub struct Room {
    pub room_number: i32,
    pub room_name: String,
    pub door_label: String,
    pub description: String,
    pub display_order: i32,
    pub is_active: bool,
}

/// `POST /api/rooms` body.
#[derive(Debug, Clone, Deserialize)]
pub struct RoomInput {
    pub room_number: i32,
    pub room_name: String,
    #[serde(default)]
    pub door_label: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub display_order: i32,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

const fn default_true() -> bool {
    true
}

impl RoomInput {
    /// Check and tidy the input.
    ///
    /// # Errors
    ///
    /// Returns a user-facing message.
    pub fn validate(mut self) -> Result<Self, &'static str> {
        if !(0..=99).contains(&self.room_number) {
            return Err("Room number must be between 0 and 99");
        }
        self.room_name = self.room_name.trim().to_owned();
        if self.room_name.is_empty() {
            return Err("Room name is required");
        }
        self.door_label = self.door_label.trim().to_owned();
        if self.door_label.is_empty() {
            self.door_label.clone_from(&self.room_name);
        }
        self.description = self.description.trim().to_owned();
        Ok(self)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RoomAssignment {
    pub id: RoomAssignmentId,
    pub room_number: i32,
    pub room_name: String,
    pub category_id: CategoryId,
    pub category_name: String,
    pub is_primary: bool,
    pub display_order: i32,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn input(number: i32, name: &str) -> RoomInput {
        RoomInput {
            room_number: number,
            room_name: name.to_owned(),
            door_label: String::new(),
            description: String::new(),
            display_order: 0,
            is_active: true,
        }
    }

    #[test]
    fn test_door_label_defaults_to_name() {
        let room = input(7, " Mugs ").validate().unwrap();
        assert_eq!(room.room_name, "Mugs");
        assert_eq!(room.door_label, "Mugs");
    }

    #[test]
    fn test_rejects_bad_rooms() {
        assert!(input(100, "Attic").validate().is_err());
        assert!(input(3, "  ").validate().is_err());
    }

    #[test]
    fn test_is_active_defaults_true() {
        let room: RoomInput = serde_json::from_str(r#"{"room_number":7,"room_name":"Mugs"}"#).unwrap();
        assert!(room.is_active);
    }
}
