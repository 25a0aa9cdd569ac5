//! Rooms and their category assignments.
//!
//! A room has at most one primary category; assigning a new primary demotes
//! the previous one in the same transaction.

use sqlx::PgPool;

use whimsical_frog_core::{CategoryId, RoomAssignmentId};

use super::RepositoryError;
use crate::models::{Room, RoomAssignment, RoomInput};

/// What `DELETE /api/rooms/{n}` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomRemoval {
    /// The room was active and is now hidden.
    Deactivated,
    /// The room was already inactive and is gone, with its assignments.
    Deleted,
}

impl RoomRemoval {
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::Deactivated => "Room deactivated",
            Self::Deleted => "Room permanently deleted",
        }
    }

    #[must_use]
    pub const fn action(self) -> &'static str {
        match self {
            Self::Deactivated => "deactivated",
            Self::Deleted => "deleted",
        }
    }
}

#[derive(sqlx::FromRow)]
struct RoomRow {
    room_number: i32,
    room_name: String,
    door_label: String,
    description: String,
    display_order: i32,
    is_active: bool,
}

impl From<RoomRow> for Room {
    fn from(row: RoomRow) -> Self {
        Self {
            room_number: row.room_number,
            room_name: row.room_name,
            door_label: row.door_label,
            description: row.description,
            display_order: row.display_order,
            is_active: row.is_active,
        }
    }
}

#[derive(sqlx::FromRow)]
struct AssignmentRow {
    id: RoomAssignmentId,
    room_number: i32,
    room_name: String,
    category_id: CategoryId,
    category_name: String,
    is_primary: bool,
    display_order: i32,
}

impl From<AssignmentRow> for RoomAssignment {
    fn from(row: AssignmentRow) -> Self {
        Self {
            id: row.id,
            room_number: row.room_number,
            room_name: row.room_name,
            category_id: row.category_id,
            category_name: row.category_name,
            is_primary: row.is_primary,
            display_order: row.display_order,
        }
    }
}

const ROOM_COLUMNS: &str = "room_number, room_name, door_label, description, display_order, is_active";

pub struct RoomRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> RoomRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Every room, active or not, in display order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<Room>, RepositoryError> {
        let rows: Vec<RoomRow> = sqlx::query_as(&format!(
            "SELECT {ROOM_COLUMNS} FROM shop.rooms ORDER BY display_order, room_number"
        ))
        .fetch_all(self.pool)
        .await?;
        Ok(rows.into_iter().map(Room::from).collect())
    }

    /// Create or replace a room's settings.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn upsert(&self, room: &RoomInput) -> Result<Room, RepositoryError> {
        let row: RoomRow = sqlx::query_as(&format!(
            r"
            INSERT INTO shop.rooms (room_number, room_name, door_label, description, display_order, is_active)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (room_number) DO UPDATE SET
                room_name = EXCLUDED.room_name,
                door_label = EXCLUDED.door_label,
                description = EXCLUDED.description,
                display_order = EXCLUDED.display_order,
                is_active = EXCLUDED.is_active,
                updated_at = now()
            RETURNING {ROOM_COLUMNS}
            "
        ))
        .bind(room.room_number)
        .bind(&room.room_name)
        .bind(&room.door_label)
        .bind(&room.description)
        .bind(room.display_order)
        .bind(room.is_active)
        .fetch_one(self.pool)
        .await?;
        Ok(row.into())
    }

    /// Deactivate an active room; delete an inactive one.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the room does not exist.
    pub async fn remove(&self, room_number: i32) -> Result<RoomRemoval, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        let active: bool =
            sqlx::query_scalar("SELECT is_active FROM shop.rooms WHERE room_number = $1 FOR UPDATE")
                .bind(room_number)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or(RepositoryError::NotFound)?;

        let removal = if active {
            sqlx::query(
                "UPDATE shop.rooms SET is_active = false, updated_at = now() WHERE room_number = $1",
            )
            .bind(room_number)
            .execute(&mut *tx)
            .await?;
            RoomRemoval::Deactivated
        } else {
            sqlx::query("DELETE FROM shop.room_category_assignments WHERE room_number = $1")
                .bind(room_number)
                .execute(&mut *tx)
                .await?;
            sqlx::query("DELETE FROM shop.rooms WHERE room_number = $1")
                .bind(room_number)
                .execute(&mut *tx)
                .await?;
            RoomRemoval::Deleted
        };

        tx.commit().await?;
        Ok(removal)
    }

    /// All assignments, grouped by room.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn assignments(&self) -> Result<Vec<RoomAssignment>, RepositoryError> {
        let rows: Vec<AssignmentRow> = sqlx::query_as(
            r"
            SELECT a.id, a.room_number, r.room_name, a.category_id, c.name AS category_name,
                   a.is_primary, a.display_order
            FROM shop.room_category_assignments a
            JOIN shop.rooms r ON r.room_number = a.room_number
            JOIN shop.categories c ON c.id = a.category_id
            ORDER BY a.room_number, a.is_primary DESC, a.display_order, c.name
            ",
        )
        .fetch_all(self.pool)
        .await?;
        Ok(rows.into_iter().map(RoomAssignment::from).collect())
    }

    /// Assign a category to a room, or update an existing assignment.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the room or category does not exist.
    pub async fn assign(
        &self,
        room_number: i32,
        category_id: CategoryId,
        is_primary: bool,
        display_order: i32,
    ) -> Result<RoomAssignmentId, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        if is_primary {
            sqlx::query(
                r"
                UPDATE shop.room_category_assignments SET is_primary = false
                WHERE room_number = $1 AND category_id <> $2 AND is_primary
                ",
            )
            .bind(room_number)
            .bind(category_id)
            .execute(&mut *tx)
            .await?;
        }

        let id = sqlx::query_scalar(
            r"
            INSERT INTO shop.room_category_assignments (room_number, category_id, is_primary, display_order)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (room_number, category_id) DO UPDATE SET
                is_primary = EXCLUDED.is_primary,
                display_order = EXCLUDED.display_order
            RETURNING id
            ",
        )
        .bind(room_number)
        .bind(category_id)
        .bind(is_primary)
        .bind(display_order)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| match RepositoryError::from_foreign_key(e, "Room or category not found") {
            RepositoryError::Conflict(_) => RepositoryError::NotFound,
            other => other,
        })?;

        tx.commit().await?;
        Ok(id)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no such assignment exists.
    pub async fn unassign(&self, id: RoomAssignmentId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM shop.room_category_assignments WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_removal_messages() {
        assert_eq!(RoomRemoval::Deactivated.message(), "Room deactivated");
        assert_eq!(RoomRemoval::Deleted.action(), "deleted");
    }
}
