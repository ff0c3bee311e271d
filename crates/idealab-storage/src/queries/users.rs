// SPDX-FileCopyrightText: 2026 IdéaLab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Registered user lookups.

use idealab_core::{IdeaLabError, Principal, UserId};
use rusqlite::params;

use crate::database::Database;

/// Fetch a user that exists and is active.
pub async fn find_active_user(
    db: &Database,
    id: UserId,
) -> Result<Option<Principal>, IdeaLabError> {
    db.connection()
        .call(move |conn| {
            let result = conn.query_row(
                "SELECT id, email, username, role FROM users WHERE id = ?1 AND is_active = 1",
                params![id],
                |row| {
                    Ok(Principal {
                        user_id: row.get(0)?,
                        email: row.get(1)?,
                        username: row.get(2)?,
                        role: row.get(3)?,
                    })
                },
            );
            match result {
                Ok(principal) => Ok(Some(principal)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Insert an active user and return its id.
pub async fn insert_user(
    db: &Database,
    username: &str,
    email: &str,
    role: &str,
) -> Result<UserId, IdeaLabError> {
    let username = username.to_string();
    let email = email.to_string();
    let role = role.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO users (username, email, role) VALUES (?1, ?2, ?3)",
                params![username, email, role],
            )?;
            Ok(conn.last_insert_rowid())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Activate or deactivate a user.
pub async fn set_user_active(db: &Database, id: UserId, active: bool) -> Result<(), IdeaLabError> {
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE users SET is_active = ?1 WHERE id = ?2",
                params![active, id],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}
