use crate::Database;
use crate::models::{AdminRow, AttachmentRow, StoryRow};
use anyhow::Result;
use rusqlite::{Connection, params};

/// Fields for a story insert. The id and creation timestamp are generated
/// by the caller so the workflow layer controls identity and time.
pub struct NewStory<'a> {
    pub id: &'a str,
    pub name: &'a str,
    pub email: &'a str,
    pub school: &'a str,
    pub location: &'a str,
    pub graduation: Option<&'a str>,
    pub story_type: &'a str,
    pub title: &'a str,
    pub body: &'a str,
    pub created_at: &'a str,
}

pub struct NewAttachment<'a> {
    pub id: &'a str,
    pub original_name: &'a str,
    pub stored_name: &'a str,
    pub content_type: &'a str,
    pub byte_size: i64,
}

/// Result of a conditional status transition.
pub enum TransitionOutcome {
    /// The story was pending and has been transitioned.
    Applied,
    /// The story exists but is not pending; carries the current status.
    NotPending(String),
    /// No story with that id.
    Missing,
}

pub struct StoryStats {
    pub total: i64,
    pub pending: i64,
    pub approved: i64,
    pub rejected: i64,
}

impl Database {
    // -- Stories --

    /// Insert a story and its attachment rows in one transaction.
    /// New stories always start pending.
    pub fn insert_story(&self, story: &NewStory, attachments: &[NewAttachment]) -> Result<()> {
        self.with_conn_mut(|conn| {
            let tx = conn.unchecked_transaction()?;
            tx.execute(
                "INSERT INTO stories
                    (id, name, email, school, location, graduation,
                     story_type, title, body, status, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, 'pending', ?10)",
                params![
                    story.id,
                    story.name,
                    story.email,
                    story.school,
                    story.location,
                    story.graduation,
                    story.story_type,
                    story.title,
                    story.body,
                    story.created_at,
                ],
            )?;

            for (position, att) in attachments.iter().enumerate() {
                tx.execute(
                    "INSERT INTO attachments
                        (id, story_id, position, original_name, stored_name,
                         content_type, byte_size)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                    params![
                        att.id,
                        story.id,
                        position as i64,
                        att.original_name,
                        att.stored_name,
                        att.content_type,
                        att.byte_size,
                    ],
                )?;
            }

            tx.commit()?;
            Ok(())
        })
    }

    pub fn get_story(&self, id: &str) -> Result<Option<StoryRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!("{STORY_COLUMNS} WHERE id = ?1"))?;
            let row = stmt.query_row([id], map_story_row).optional()?;
            Ok(row)
        })
    }

    /// Stories newest-first, optionally filtered by status, capped at `limit`.
    pub fn list_stories(&self, status: Option<&str>, limit: u32) -> Result<Vec<StoryRow>> {
        self.with_conn(|conn| match status {
            Some(status) => {
                let mut stmt = conn.prepare(&format!(
                    "{STORY_COLUMNS} WHERE status = ?1 ORDER BY created_at DESC LIMIT ?2"
                ))?;
                let rows = stmt
                    .query_map(params![status, limit], map_story_row)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(rows)
            }
            None => {
                let mut stmt =
                    conn.prepare(&format!("{STORY_COLUMNS} ORDER BY created_at DESC LIMIT ?1"))?;
                let rows = stmt
                    .query_map([limit], map_story_row)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(rows)
            }
        })
    }

    pub fn attachments_for(&self, story_id: &str) -> Result<Vec<AttachmentRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, story_id, position, original_name, stored_name,
                        content_type, byte_size
                 FROM attachments WHERE story_id = ?1 ORDER BY position",
            )?;
            let rows = stmt
                .query_map([story_id], |row| {
                    Ok(AttachmentRow {
                        id: row.get(0)?,
                        story_id: row.get(1)?,
                        position: row.get(2)?,
                        original_name: row.get(3)?,
                        stored_name: row.get(4)?,
                        content_type: row.get(5)?,
                        byte_size: row.get(6)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// pending -> approved. The WHERE clause makes the transition conditional;
    /// a zero-row update is disambiguated with a follow-up lookup.
    pub fn approve_story(
        &self,
        id: &str,
        approved_by: &str,
        approved_at: &str,
    ) -> Result<TransitionOutcome> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE stories
                 SET status = 'approved', approved_at = ?2, approved_by = ?3
                 WHERE id = ?1 AND status = 'pending'",
                params![id, approved_at, approved_by],
            )?;
            if changed > 0 {
                return Ok(TransitionOutcome::Applied);
            }
            transition_miss(conn, id)
        })
    }

    /// pending -> rejected, storing the reason verbatim (absent stays NULL).
    pub fn reject_story(&self, id: &str, reason: Option<&str>) -> Result<TransitionOutcome> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE stories
                 SET status = 'rejected', rejection_reason = ?2
                 WHERE id = ?1 AND status = 'pending'",
                params![id, reason],
            )?;
            if changed > 0 {
                return Ok(TransitionOutcome::Applied);
            }
            transition_miss(conn, id)
        })
    }

    /// Delete a story. Returns the stored file names of its attachments so
    /// the caller can clean up the upload directory; attachment rows go with
    /// the story via ON DELETE CASCADE. `None` when the id does not exist.
    pub fn delete_story(&self, id: &str) -> Result<Option<Vec<String>>> {
        self.with_conn_mut(|conn| {
            let mut stmt =
                conn.prepare("SELECT stored_name FROM attachments WHERE story_id = ?1")?;
            let stored: Vec<String> = stmt
                .query_map([id], |row| row.get(0))?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            let changed = conn.execute("DELETE FROM stories WHERE id = ?1", [id])?;
            if changed == 0 {
                return Ok(None);
            }
            Ok(Some(stored))
        })
    }

    pub fn story_stats(&self) -> Result<StoryStats> {
        self.with_conn(|conn| {
            let stats = conn.query_row(
                "SELECT COUNT(*),
                        COALESCE(SUM(status = 'pending'), 0),
                        COALESCE(SUM(status = 'approved'), 0),
                        COALESCE(SUM(status = 'rejected'), 0)
                 FROM stories",
                [],
                |row| {
                    Ok(StoryStats {
                        total: row.get(0)?,
                        pending: row.get(1)?,
                        approved: row.get(2)?,
                        rejected: row.get(3)?,
                    })
                },
            )?;
            Ok(stats)
        })
    }

    // -- Admins --

    pub fn create_admin(
        &self,
        id: &str,
        username: &str,
        password_hash: &str,
        email: &str,
    ) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO admins (id, username, password, email) VALUES (?1, ?2, ?3, ?4)",
                params![id, username, password_hash, email],
            )?;
            Ok(())
        })
    }

    pub fn get_admin_by_username(&self, username: &str) -> Result<Option<AdminRow>> {
        self.with_conn(|conn| query_admin(conn, "username", username))
    }

    pub fn get_admin_by_id(&self, id: &str) -> Result<Option<AdminRow>> {
        self.with_conn(|conn| query_admin(conn, "id", id))
    }

    pub fn admin_count(&self) -> Result<i64> {
        self.with_conn(|conn| {
            let count = conn.query_row("SELECT COUNT(*) FROM admins", [], |r| r.get(0))?;
            Ok(count)
        })
    }
}

const STORY_COLUMNS: &str = "SELECT id, name, email, school, location, graduation, story_type,
        title, body, status, rejection_reason, created_at, approved_at, approved_by
 FROM stories";

fn map_story_row(row: &rusqlite::Row<'_>) -> std::result::Result<StoryRow, rusqlite::Error> {
    Ok(StoryRow {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        school: row.get(3)?,
        location: row.get(4)?,
        graduation: row.get(5)?,
        story_type: row.get(6)?,
        title: row.get(7)?,
        body: row.get(8)?,
        status: row.get(9)?,
        rejection_reason: row.get(10)?,
        created_at: row.get(11)?,
        approved_at: row.get(12)?,
        approved_by: row.get(13)?,
    })
}

fn transition_miss(conn: &Connection, id: &str) -> Result<TransitionOutcome> {
    let current = conn
        .query_row("SELECT status FROM stories WHERE id = ?1", [id], |row| {
            row.get::<_, String>(0)
        })
        .optional()?;
    Ok(match current {
        Some(status) => TransitionOutcome::NotPending(status),
        None => TransitionOutcome::Missing,
    })
}

fn query_admin(conn: &Connection, column: &str, value: &str) -> Result<Option<AdminRow>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT id, username, password, email, created_at FROM admins WHERE {column} = ?1"
    ))?;

    let row = stmt
        .query_row([value], |row| {
            Ok(AdminRow {
                id: row.get(0)?,
                username: row.get(1)?,
                password: row.get(2)?,
                email: row.get(3)?,
                created_at: row.get(4)?,
            })
        })
        .optional()?;

    Ok(row)
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db() -> Database {
        Database::open_in_memory().unwrap()
    }

    fn story<'a>(id: &'a str, created_at: &'a str) -> NewStory<'a> {
        NewStory {
            id,
            name: "Ada Vaughn",
            email: "ada@example.com",
            school: "Morehouse",
            location: "Atlanta",
            graduation: Some("1998"),
            story_type: "memoir",
            title: "The Long Walk",
            body: "It started on a Tuesday.",
            created_at,
        }
    }

    #[test]
    fn insert_and_fetch_with_attachments() {
        let db = test_db();
        let attachments = [NewAttachment {
            id: "att-1",
            original_name: "walk.jpg",
            stored_name: "9f3a.jpg",
            content_type: "image/jpeg",
            byte_size: 2048,
        }];
        db.insert_story(&story("s1", "2024-05-01T10:00:00+00:00"), &attachments)
            .unwrap();

        let row = db.get_story("s1").unwrap().unwrap();
        assert_eq!(row.status, "pending");
        assert_eq!(row.title, "The Long Walk");
        assert!(row.approved_at.is_none());

        let atts = db.attachments_for("s1").unwrap();
        assert_eq!(atts.len(), 1);
        assert_eq!(atts[0].stored_name, "9f3a.jpg");
        assert_eq!(atts[0].byte_size, 2048);
    }

    #[test]
    fn blank_required_field_is_never_persisted() {
        let db = test_db();
        let mut bad = story("s1", "2024-05-01T10:00:00+00:00");
        bad.title = "   ";
        assert!(db.insert_story(&bad, &[]).is_err());
        assert!(db.get_story("s1").unwrap().is_none());
    }

    #[test]
    fn list_is_newest_first_and_capped() {
        let db = test_db();
        db.insert_story(&story("old", "2024-05-01T10:00:00+00:00"), &[])
            .unwrap();
        db.insert_story(&story("mid", "2024-05-02T10:00:00+00:00"), &[])
            .unwrap();
        db.insert_story(&story("new", "2024-05-03T10:00:00+00:00"), &[])
            .unwrap();

        let rows = db.list_stories(None, 100).unwrap();
        let ids: Vec<&str> = rows.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["new", "mid", "old"]);

        let capped = db.list_stories(None, 2).unwrap();
        assert_eq!(capped.len(), 2);
        assert_eq!(capped[0].id, "new");
    }

    #[test]
    fn list_filters_by_status() {
        let db = test_db();
        db.insert_story(&story("a", "2024-05-01T10:00:00+00:00"), &[])
            .unwrap();
        db.insert_story(&story("b", "2024-05-02T10:00:00+00:00"), &[])
            .unwrap();
        db.approve_story("a", "admin", "2024-05-03T10:00:00+00:00")
            .unwrap();

        let approved = db.list_stories(Some("approved"), 50).unwrap();
        assert_eq!(approved.len(), 1);
        assert_eq!(approved[0].id, "a");

        let pending = db.list_stories(Some("pending"), 50).unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, "b");
    }

    #[test]
    fn approve_sets_audit_fields() {
        let db = test_db();
        db.insert_story(&story("s1", "2024-05-01T10:00:00+00:00"), &[])
            .unwrap();

        let outcome = db
            .approve_story("s1", "admin", "2024-05-02T09:30:00+00:00")
            .unwrap();
        assert!(matches!(outcome, TransitionOutcome::Applied));

        let row = db.get_story("s1").unwrap().unwrap();
        assert_eq!(row.status, "approved");
        assert_eq!(row.approved_by.as_deref(), Some("admin"));
        assert!(row.approved_at.as_deref() >= Some(row.created_at.as_str()));
    }

    #[test]
    fn transitions_require_pending() {
        let db = test_db();
        db.insert_story(&story("s1", "2024-05-01T10:00:00+00:00"), &[])
            .unwrap();
        db.approve_story("s1", "admin", "2024-05-02T09:30:00+00:00")
            .unwrap();

        let again = db
            .approve_story("s1", "admin", "2024-05-02T09:31:00+00:00")
            .unwrap();
        assert!(matches!(again, TransitionOutcome::NotPending(s) if s == "approved"));

        let rejected = db.reject_story("s1", Some("too late")).unwrap();
        assert!(matches!(rejected, TransitionOutcome::NotPending(_)));

        let missing = db.approve_story("nope", "admin", "2024-05-02T09:32:00+00:00");
        assert!(matches!(missing.unwrap(), TransitionOutcome::Missing));
    }

    #[test]
    fn reject_stores_reason_verbatim() {
        let db = test_db();
        db.insert_story(&story("s1", "2024-05-01T10:00:00+00:00"), &[])
            .unwrap();
        db.insert_story(&story("s2", "2024-05-01T11:00:00+00:00"), &[])
            .unwrap();

        db.reject_story("s1", Some("  not a fit  ")).unwrap();
        let row = db.get_story("s1").unwrap().unwrap();
        assert_eq!(row.status, "rejected");
        assert_eq!(row.rejection_reason.as_deref(), Some("  not a fit  "));

        db.reject_story("s2", None).unwrap();
        let row = db.get_story("s2").unwrap().unwrap();
        assert!(row.rejection_reason.is_none());
    }

    #[test]
    fn delete_cascades_and_returns_stored_names() {
        let db = test_db();
        let attachments = [
            NewAttachment {
                id: "att-1",
                original_name: "a.pdf",
                stored_name: "x1.pdf",
                content_type: "application/pdf",
                byte_size: 10,
            },
            NewAttachment {
                id: "att-2",
                original_name: "b.png",
                stored_name: "x2.png",
                content_type: "image/png",
                byte_size: 20,
            },
        ];
        db.insert_story(&story("s1", "2024-05-01T10:00:00+00:00"), &attachments)
            .unwrap();

        let stored = db.delete_story("s1").unwrap().unwrap();
        assert_eq!(stored, ["x1.pdf", "x2.png"]);
        assert!(db.get_story("s1").unwrap().is_none());
        assert!(db.attachments_for("s1").unwrap().is_empty());

        assert!(db.delete_story("s1").unwrap().is_none());
    }

    #[test]
    fn stats_count_by_status() {
        let db = test_db();
        db.insert_story(&story("a", "2024-05-01T10:00:00+00:00"), &[])
            .unwrap();
        db.insert_story(&story("b", "2024-05-02T10:00:00+00:00"), &[])
            .unwrap();
        db.insert_story(&story("c", "2024-05-03T10:00:00+00:00"), &[])
            .unwrap();
        db.approve_story("a", "admin", "2024-05-04T10:00:00+00:00")
            .unwrap();
        db.reject_story("b", None).unwrap();

        let stats = db.story_stats().unwrap();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.pending, 1);
        assert_eq!(stats.approved, 1);
        assert_eq!(stats.rejected, 1);
    }

    #[test]
    fn admin_usernames_are_unique() {
        let db = test_db();
        db.create_admin("a1", "admin", "hash", "admin@example.com")
            .unwrap();
        assert!(
            db.create_admin("a2", "admin", "hash2", "other@example.com")
                .is_err()
        );
        assert_eq!(db.admin_count().unwrap(), 1);

        let found = db.get_admin_by_username("admin").unwrap().unwrap();
        assert_eq!(found.id, "a1");
        assert!(db.get_admin_by_username("nobody").unwrap().is_none());
    }
}
