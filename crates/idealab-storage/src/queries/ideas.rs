// SPDX-FileCopyrightText: 2026 IdéaLab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Idea lookups and counters.

use idealab_core::{IdeaId, IdeaLabError, UserId};
use rusqlite::params;

use crate::database::Database;
use crate::models::IdeaCounters;

/// Whether an idea with `id` exists.
pub async fn idea_exists(db: &Database, id: IdeaId) -> Result<bool, IdeaLabError> {
    db.connection()
        .call(move |conn| {
            let exists: bool = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM ideas WHERE id = ?1)",
                params![id],
                |row| row.get(0),
            )?;
            Ok(exists)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Insert an idea and return its id.
pub async fn insert_idea(
    db: &Database,
    title: &str,
    description: &str,
    author: Option<UserId>,
) -> Result<IdeaId, IdeaLabError> {
    let title = title.to_string();
    let description = description.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO ideas (title, description, user_id) VALUES (?1, ?2, ?3)",
                params![title, description, author],
            )?;
            Ok(conn.last_insert_rowid())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Counters for an idea, or `None` if it does not exist.
pub async fn idea_counters(
    db: &Database,
    id: IdeaId,
) -> Result<Option<IdeaCounters>, IdeaLabError> {
    db.connection()
        .call(move |conn| {
            let result = conn.query_row(
                "SELECT votes_count, comments_count, views_count, shares_count
                 FROM ideas WHERE id = ?1",
                params![id],
                |row| {
                    Ok(IdeaCounters {
                        votes_count: row.get(0)?,
                        comments_count: row.get(1)?,
                        views_count: row.get(2)?,
                        shares_count: row.get(3)?,
                    })
                },
            );
            match result {
                Ok(counters) => Ok(Some(counters)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}
