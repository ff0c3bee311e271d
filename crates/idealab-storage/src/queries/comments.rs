// SPDX-FileCopyrightText: 2026 IdéaLab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Comment CRUD with soft delete and `comments_count` maintenance.

use idealab_core::{
    Comment, CommentId, CommentPage, CommentRef, IdeaId, IdeaLabError, NewComment, Pagination,
    SessionToken, VoteOwner,
};
use rusqlite::{Connection, Row, params};

use crate::database::Database;

const COMMENT_COLUMNS: &str = "c.id, c.idea_id, c.parent_id, c.content, c.author_name, \
     c.user_id IS NOT NULL, \
     (SELECT COUNT(*) FROM comments r WHERE r.parent_id = c.id AND r.is_active = 1), \
     c.created_at, c.updated_at";

fn row_to_comment(row: &Row<'_>) -> rusqlite::Result<Comment> {
    Ok(Comment {
        id: row.get(0)?,
        idea_id: row.get(1)?,
        parent_id: row.get(2)?,
        content: row.get(3)?,
        author_name: row.get(4)?,
        is_registered_user: row.get(5)?,
        replies_count: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

fn select_comment(conn: &Connection, id: CommentId) -> rusqlite::Result<Comment> {
    conn.query_row(
        &format!("SELECT {COMMENT_COLUMNS} FROM comments c WHERE c.id = ?1"),
        params![id],
        row_to_comment,
    )
}

/// Location and ownership of an active comment.
pub async fn find_active_comment(
    db: &Database,
    id: CommentId,
) -> Result<Option<CommentRef>, IdeaLabError> {
    db.connection()
        .call(move |conn| {
            let result = conn.query_row(
                "SELECT id, idea_id, user_id, session_id FROM comments
                 WHERE id = ?1 AND is_active = 1",
                params![id],
                |row| {
                    let session: Option<String> = row.get(3)?;
                    Ok(CommentRef {
                        id: row.get(0)?,
                        idea_id: row.get(1)?,
                        user_id: row.get(2)?,
                        session: session.as_deref().and_then(SessionToken::parse),
                    })
                },
            );
            match result {
                Ok(found) => Ok(Some(found)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Insert a comment and bump the idea's `comments_count`.
pub async fn insert_comment(db: &Database, comment: &NewComment) -> Result<Comment, IdeaLabError> {
    let comment = comment.clone();
    let (user_id, session_id) = match &comment.owner {
        VoteOwner::User(id) => (Some(*id), None),
        VoteOwner::Session(token) => (None, Some(token.as_str().to_string())),
    };
    let address = comment.address.map(|a| a.to_string());

    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO comments
                   (idea_id, parent_id, user_id, session_id, ip_address, author_name, author_email, content)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    comment.idea_id,
                    comment.parent_id,
                    user_id,
                    session_id,
                    address,
                    comment.author_name,
                    comment.author_email,
                    comment.content,
                ],
            )?;
            let id = tx.last_insert_rowid();
            tx.execute(
                "UPDATE ideas SET comments_count = comments_count + 1 WHERE id = ?1",
                params![comment.idea_id],
            )?;
            let stored = select_comment(&tx, id)?;
            tx.commit()?;
            Ok(stored)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Active top-level comments for an idea, newest first.
pub async fn list_top_level(
    db: &Database,
    idea_id: IdeaId,
    page: u32,
    limit: u32,
) -> Result<CommentPage, IdeaLabError> {
    let page = page.max(1);
    let offset = i64::from(page - 1) * i64::from(limit);
    db.connection()
        .call(move |conn| {
            let total: i64 = conn.query_row(
                "SELECT COUNT(*) FROM comments
                 WHERE idea_id = ?1 AND parent_id IS NULL AND is_active = 1",
                params![idea_id],
                |row| row.get(0),
            )?;

            let mut stmt = conn.prepare(&format!(
                "SELECT {COMMENT_COLUMNS} FROM comments c
                 WHERE c.idea_id = ?1 AND c.parent_id IS NULL AND c.is_active = 1
                 ORDER BY c.created_at DESC, c.id DESC
                 LIMIT ?2 OFFSET ?3"
            ))?;
            let rows = stmt.query_map(params![idea_id, limit, offset], row_to_comment)?;
            let mut comments = Vec::new();
            for row in rows {
                comments.push(row?);
            }

            Ok(CommentPage {
                comments,
                pagination: Pagination::new(page, limit, u64::try_from(total).unwrap_or(0)),
            })
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Active replies to a comment, oldest first.
pub async fn list_replies(
    db: &Database,
    parent_id: CommentId,
) -> Result<Vec<Comment>, IdeaLabError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COMMENT_COLUMNS} FROM comments c
                 WHERE c.parent_id = ?1 AND c.is_active = 1
                 ORDER BY c.created_at ASC, c.id ASC"
            ))?;
            let rows = stmt.query_map(params![parent_id], row_to_comment)?;
            let mut replies = Vec::new();
            for row in rows {
                replies.push(row?);
            }
            Ok(replies)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Replace the content of an active comment.
pub async fn update_content(
    db: &Database,
    id: CommentId,
    content: &str,
) -> Result<Comment, IdeaLabError> {
    let content = content.to_string();
    db.connection()
        .call(move |conn| -> Result<Result<Comment, IdeaLabError>, rusqlite::Error> {
            let changed = conn.execute(
                "UPDATE comments
                 SET content = ?1, updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?2 AND is_active = 1",
                params![content, id],
            )?;
            if changed == 0 {
                return Ok(Err(IdeaLabError::comment_not_found(id)));
            }
            Ok(Ok(select_comment(conn, id)?))
        })
        .await
        .map_err(crate::database::map_tr_err)?
}

/// Soft delete an active comment and decrement the idea's `comments_count`.
pub async fn deactivate(db: &Database, id: CommentId) -> Result<(), IdeaLabError> {
    db.connection()
        .call(move |conn| -> Result<Result<(), IdeaLabError>, rusqlite::Error> {
            let tx = conn.transaction()?;
            let changed = tx.execute(
                "UPDATE comments
                 SET is_active = 0, updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?1 AND is_active = 1",
                params![id],
            )?;
            if changed == 0 {
                return Ok(Err(IdeaLabError::comment_not_found(id)));
            }
            tx.execute(
                "UPDATE ideas SET comments_count = MAX(comments_count - 1, 0)
                 WHERE id = (SELECT idea_id FROM comments WHERE id = ?1)",
                params![id],
            )?;
            tx.commit()?;
            Ok(Ok(()))
        })
        .await
        .map_err(crate::database::map_tr_err)?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::ideas::{idea_counters, insert_idea};
    use std::net::{IpAddr, Ipv4Addr};

    fn draft(idea_id: IdeaId, parent_id: Option<CommentId>, content: &str) -> NewComment {
        NewComment {
            idea_id,
            parent_id,
            content: content.to_string(),
            owner: VoteOwner::Session(SessionToken::parse("sess-a").unwrap()),
            address: Some(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 5))),
            author_name: "Anonymous".to_string(),
            author_email: "anon@example.org".to_string(),
        }
    }

    async fn setup() -> (Database, IdeaId) {
        let db = Database::open_in_memory().await.unwrap();
        let idea = insert_idea(&db, "idea", "", None).await.unwrap();
        (db, idea)
    }

    #[tokio::test]
    async fn insert_bumps_counter_and_returns_row() {
        let (db, idea) = setup().await;
        let stored = insert_comment(&db, &draft(idea, None, "Nice idea"))
            .await
            .unwrap();
        assert_eq!(stored.content, "Nice idea");
        assert!(!stored.is_registered_user);
        assert_eq!(stored.replies_count, 0);
        assert_eq!(
            idea_counters(&db, idea).await.unwrap().unwrap().comments_count,
            1
        );

        let found = find_active_comment(&db, stored.id).await.unwrap().unwrap();
        assert_eq!(found.idea_id, idea);
        assert_eq!(found.user_id, None);
        assert_eq!(found.session.unwrap().as_str(), "sess-a");
    }

    #[tokio::test]
    async fn listing_pages_top_level_and_counts_replies() {
        let (db, idea) = setup().await;
        let first = insert_comment(&db, &draft(idea, None, "first")).await.unwrap();
        insert_comment(&db, &draft(idea, None, "second")).await.unwrap();
        insert_comment(&db, &draft(idea, Some(first.id), "reply")).await.unwrap();

        let page = list_top_level(&db, idea, 1, 1).await.unwrap();
        assert_eq!(page.pagination.total, 2);
        assert_eq!(page.pagination.pages, 2);
        assert_eq!(page.comments.len(), 1);
        assert_eq!(page.comments[0].content, "second");

        let page2 = list_top_level(&db, idea, 2, 1).await.unwrap();
        assert_eq!(page2.comments[0].content, "first");
        assert_eq!(page2.comments[0].replies_count, 1);

        let replies = list_replies(&db, first.id).await.unwrap();
        assert_eq!(replies.len(), 1);
        assert_eq!(replies[0].parent_id, Some(first.id));
    }

    #[tokio::test]
    async fn deactivate_hides_comment_and_decrements() {
        let (db, idea) = setup().await;
        let c = insert_comment(&db, &draft(idea, None, "to delete")).await.unwrap();

        deactivate(&db, c.id).await.unwrap();
        assert!(find_active_comment(&db, c.id).await.unwrap().is_none());
        assert_eq!(
            idea_counters(&db, idea).await.unwrap().unwrap().comments_count,
            0
        );
        assert!(list_top_level(&db, idea, 1, 20).await.unwrap().comments.is_empty());

        assert!(matches!(
            deactivate(&db, c.id).await,
            Err(IdeaLabError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn update_content_changes_active_rows_only() {
        let (db, idea) = setup().await;
        let c = insert_comment(&db, &draft(idea, None, "old text")).await.unwrap();

        let updated = update_content(&db, c.id, "new text").await.unwrap();
        assert_eq!(updated.content, "new text");

        deactivate(&db, c.id).await.unwrap();
        assert!(matches!(
            update_content(&db, c.id, "again").await,
            Err(IdeaLabError::NotFound { .. })
        ));
    }
}
