// SPDX-FileCopyrightText: 2026 IdéaLab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Vote ledger rows for both categories.
//!
//! `regular` votes live in `votes`, `payment` votes in `payment_votes`. Both
//! tables carry partial unique indexes: one per `(user_id, idea_id)` for
//! registered owners and one per `(session_id, idea_id)` where `user_id IS NULL`.

use std::net::IpAddr;
use std::time::Duration;

use idealab_core::{
    Ballot, IdeaId, IdeaLabError, SessionToken, VoteCategory, VoteOwner, VoteRecord, VoteTally,
    VoteTransition,
};
use rusqlite::types::{Type, Value};
use rusqlite::{Row, params};

use crate::database::{Database, is_unique_violation};

const NOW: &str = "strftime('%Y-%m-%dT%H:%M:%fZ', 'now')";

fn table(category: VoteCategory) -> &'static str {
    match category {
        VoteCategory::Regular => "votes",
        VoteCategory::Payment => "payment_votes",
    }
}

/// `WHERE` fragment matching the owner, bound to `?1`.
///
/// Session owners only match rows with no user id.
fn owner_clause(owner: &VoteOwner) -> (&'static str, Value) {
    match owner {
        VoteOwner::User(id) => ("user_id = ?1", Value::Integer(*id)),
        VoteOwner::Session(token) => (
            "user_id IS NULL AND session_id = ?1",
            Value::Text(token.as_str().to_string()),
        ),
    }
}

fn owner_columns(owner: &VoteOwner) -> (Option<i64>, Option<String>) {
    match owner {
        VoteOwner::User(id) => (Some(*id), None),
        VoteOwner::Session(token) => (None, Some(token.as_str().to_string())),
    }
}

fn conversion_error(index: usize, err: IdeaLabError) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(index, Type::Text, Box::new(err))
}

fn parse_ballot(category: VoteCategory, index: usize, raw: &str) -> rusqlite::Result<Ballot> {
    Ballot::parse(category, raw).map_err(|e| conversion_error(index, e))
}

fn row_to_record(category: VoteCategory, row: &Row<'_>) -> rusqlite::Result<VoteRecord> {
    let vote_type: String = row.get(2)?;
    let user_id: Option<i64> = row.get(3)?;
    let session_id: Option<String> = row.get(4)?;
    let ip_address: Option<String> = row.get(5)?;

    let owner = match (user_id, session_id) {
        (Some(id), _) => VoteOwner::User(id),
        (None, Some(raw)) => SessionToken::parse(&raw).map(VoteOwner::Session).ok_or_else(|| {
            conversion_error(4, IdeaLabError::Internal("malformed session_id".into()))
        })?,
        (None, None) => {
            return Err(conversion_error(
                3,
                IdeaLabError::Internal("vote row has no owner".into()),
            ));
        }
    };

    Ok(VoteRecord {
        id: row.get(0)?,
        idea_id: row.get(1)?,
        ballot: parse_ballot(category, 2, &vote_type)?,
        owner,
        address: ip_address.and_then(|a| a.parse().ok()),
        created_at: row.get(6)?,
    })
}

/// Fetch the owner's vote on (idea, category).
pub async fn find_vote(
    db: &Database,
    owner: &VoteOwner,
    idea_id: IdeaId,
    category: VoteCategory,
) -> Result<Option<VoteRecord>, IdeaLabError> {
    let (clause, owner_value) = owner_clause(owner);
    let sql = format!(
        "SELECT id, idea_id, vote_type, user_id, session_id, ip_address, created_at
         FROM {} WHERE {clause} AND idea_id = ?2",
        table(category)
    );
    db.connection()
        .call(move |conn| {
            let result = conn.query_row(&sql, params![owner_value, idea_id], |row| {
                row_to_record(category, row)
            });
            match result {
                Ok(record) => Ok(Some(record)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Apply a ledger transition in one transaction.
///
/// A rejected insert or a compare-and-swap miss rolls back and returns
/// [`IdeaLabError::ConstraintConflict`]. For the `regular` category the
/// idea's `votes_count` moves by the outcome's net delta in the same
/// transaction, floored at zero.
pub async fn apply_transition(
    db: &Database,
    owner: &VoteOwner,
    address: Option<IpAddr>,
    idea_id: IdeaId,
    transition: VoteTransition,
) -> Result<(), IdeaLabError> {
    let category = transition.category();
    let table = table(category);
    let (clause, owner_value) = owner_clause(owner);
    let (user_id, session_id) = owner_columns(owner);
    let address = address.map(|a| a.to_string());
    let delta = transition.outcome().net_delta();

    db.connection()
        .call(move |conn| -> Result<Result<(), IdeaLabError>, rusqlite::Error> {
            let tx = conn.transaction()?;

            let changed = match transition {
                VoteTransition::Create(ballot) => {
                    let inserted = tx.execute(
                        &format!(
                            "INSERT INTO {table} (idea_id, user_id, session_id, ip_address, vote_type)
                             VALUES (?1, ?2, ?3, ?4, ?5)"
                        ),
                        params![idea_id, user_id, session_id, address, ballot.as_str()],
                    );
                    match inserted {
                        Ok(n) => n,
                        Err(e) if is_unique_violation(&e) => 0,
                        Err(e) => return Err(e),
                    }
                }
                VoteTransition::Replace { from, to } => tx.execute(
                    &format!(
                        "UPDATE {table}
                         SET vote_type = ?3, ip_address = COALESCE(?4, ip_address), created_at = {NOW}
                         WHERE {clause} AND idea_id = ?2 AND vote_type = ?5"
                    ),
                    params![owner_value, idea_id, to.as_str(), address, from.as_str()],
                )?,
                VoteTransition::Remove(ballot) => tx.execute(
                    &format!("DELETE FROM {table} WHERE {clause} AND idea_id = ?2 AND vote_type = ?3"),
                    params![owner_value, idea_id, ballot.as_str()],
                )?,
                VoteTransition::Overwrite(ballot) => tx.execute(
                    &format!(
                        "UPDATE {table}
                         SET vote_type = ?3, ip_address = COALESCE(?4, ip_address), created_at = {NOW}
                         WHERE {clause} AND idea_id = ?2"
                    ),
                    params![owner_value, idea_id, ballot.as_str(), address],
                )?,
            };

            if changed != 1 {
                // Dropping the transaction rolls it back.
                return Ok(Err(IdeaLabError::ConstraintConflict));
            }

            if category == VoteCategory::Regular && delta != 0 {
                tx.execute(
                    "UPDATE ideas SET votes_count = MAX(votes_count + ?1, 0) WHERE id = ?2",
                    params![delta, idea_id],
                )?;
            }

            tx.commit()?;
            Ok(Ok(()))
        })
        .await
        .map_err(crate::database::map_tr_err)?
}

/// Whether another anonymous session voted on (idea, category) from
/// `address` within `within`.
pub async fn address_has_other_vote(
    db: &Database,
    address: IpAddr,
    idea_id: IdeaId,
    category: VoteCategory,
    excluding: &SessionToken,
    within: Duration,
) -> Result<bool, IdeaLabError> {
    let sql = format!(
        "SELECT EXISTS(
             SELECT 1 FROM {} WHERE ip_address = ?1 AND idea_id = ?2
               AND user_id IS NULL AND session_id <> ?3
               AND created_at >= strftime('%Y-%m-%dT%H:%M:%fZ', 'now', ?4))",
        table(category)
    );
    let address = address.to_string();
    let excluding = excluding.as_str().to_string();
    let modifier = format!("-{} seconds", within.as_secs());
    db.connection()
        .call(move |conn| {
            let exists: bool = conn.query_row(
                &sql,
                params![address, idea_id, excluding, modifier],
                |row| row.get(0),
            )?;
            Ok(exists)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Counts per value for both categories, zero-filled.
pub async fn tally(db: &Database, idea_id: IdeaId) -> Result<VoteTally, IdeaLabError> {
    db.connection()
        .call(move |conn| {
            let mut tally = VoteTally::default();
            for category in VoteCategory::ALL {
                let mut stmt = conn.prepare(&format!(
                    "SELECT vote_type, COUNT(*) FROM {} WHERE idea_id = ?1 GROUP BY vote_type",
                    table(category)
                ))?;
                let rows = stmt.query_map(params![idea_id], |row| {
                    let raw: String = row.get(0)?;
                    let count: i64 = row.get(1)?;
                    Ok((parse_ballot(category, 0, &raw)?, count))
                })?;
                for row in rows {
                    let (ballot, count) = row?;
                    tally.add(ballot, u64::try_from(count).unwrap_or(0));
                }
            }
            Ok(tally)
        })
        .await
        .map_err(crate::database::map_tr_err)
}
