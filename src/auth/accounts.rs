use rusqlite::{params, OptionalExtension};

use crate::db::models::{column_error, Profile, Role};
use crate::error::{AppError, AppResult};
use crate::state::DbPool;

const MIN_PASSWORD_CHARS: usize = 8;

fn validate_username(raw: &str) -> AppResult<String> {
    let username = raw.trim().to_string();
    let len = username.chars().count();
    if !(3..=32).contains(&len) {
        return Err(AppError::BadRequest(
            "Username must be 3 to 32 characters".into(),
        ));
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(AppError::BadRequest(
            "Username may only contain letters, digits, '_' and '-'".into(),
        ));
    }
    Ok(username)
}

fn profile_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Profile> {
    let role: String = row.get(4)?;
    Ok(Profile {
        id: row.get(0)?,
        username: row.get(1)?,
        display_name: row.get(2)?,
        avatar_url: row.get(3)?,
        role: role.parse::<Role>().map_err(|e| column_error(4, e))?,
        created_at: row.get(5)?,
    })
}

pub fn user_count(pool: &DbPool) -> AppResult<i64> {
    let conn = pool.get()?;
    Ok(conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?)
}

/// Create an account. The very first account is made root.
pub fn register(
    pool: &DbPool,
    username: &str,
    password: &str,
    display_name: Option<&str>,
    allow_signup: bool,
) -> AppResult<Profile> {
    let username = validate_username(username)?;
    if password.chars().count() < MIN_PASSWORD_CHARS {
        return Err(AppError::BadRequest(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_CHARS
        )));
    }
    let display_name = display_name.map(str::trim).filter(|s| !s.is_empty());

    let hash = bcrypt::hash(password, bcrypt::DEFAULT_COST)
        .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))?;

    let conn = pool.get()?;
    conn.execute("BEGIN IMMEDIATE", [])?;

    let result: AppResult<Profile> = (|| {
        let existing: i64 = conn.query_row("SELECT COUNT(*) FROM users", [], |r| r.get(0))?;
        if existing > 0 && !allow_signup {
            return Err(AppError::Forbidden);
        }
        let taken: bool = conn.query_row(
            "SELECT COUNT(*) > 0 FROM users WHERE username = ?1 COLLATE NOCASE",
            params![username],
            |r| r.get(0),
        )?;
        if taken {
            return Err(AppError::BadRequest("Username is already taken".into()));
        }

        let role = if existing == 0 { Role::Root } else { Role::User };
        let id = uuid::Uuid::now_v7().to_string();
        conn.execute(
            "INSERT INTO users (id, username, display_name, password_hash, role)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![id, username, display_name, hash, role.as_str()],
        )?;

        Ok(conn.query_row(
            "SELECT id, username, display_name, avatar_url, role, created_at
             FROM users WHERE id = ?1",
            params![id],
            profile_from_row,
        )?)
    })();

    match result {
        Ok(profile) => {
            conn.execute("COMMIT", [])?;
            tracing::info!("Registered {} as {}", profile.username, profile.role);
            Ok(profile)
        }
        Err(e) => {
            conn.execute("ROLLBACK", []).ok();
            Err(e)
        }
    }
}

/// Check a username/password pair. `None` on any mismatch.
pub fn authenticate(pool: &DbPool, username: &str, password: &str) -> AppResult<Option<Profile>> {
    let conn = pool.get()?;
    let row: Option<(Profile, String)> = conn
        .query_row(
            "SELECT id, username, display_name, avatar_url, role, created_at, password_hash
             FROM users WHERE username = ?1 COLLATE NOCASE",
            params![username.trim()],
            |row| Ok((profile_from_row(row)?, row.get(6)?)),
        )
        .optional()?;

    Ok(row.and_then(|(profile, hash)| {
        bcrypt::verify(password, &hash)
            .unwrap_or(false)
            .then_some(profile)
    }))
}

pub fn find_by_username(pool: &DbPool, username: &str) -> AppResult<Option<Profile>> {
    let conn = pool.get()?;
    Ok(conn
        .query_row(
            "SELECT id, username, display_name, avatar_url, role, created_at
             FROM users WHERE username = ?1 COLLATE NOCASE",
            params![username],
            profile_from_row,
        )
        .optional()?)
}

pub fn list_users(pool: &DbPool) -> AppResult<Vec<Profile>> {
    let conn = pool.get()?;
    let mut stmt = conn.prepare(
        "SELECT id, username, display_name, avatar_url, role, created_at
         FROM users ORDER BY created_at ASC, username ASC",
    )?;
    let users = stmt
        .query_map([], profile_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(users)
}

/// Change a user's role. Root admins cannot change their own role.
pub fn set_role(pool: &DbPool, acting_user_id: &str, target_id: &str, role: Role) -> AppResult<()> {
    if acting_user_id == target_id {
        return Err(AppError::BadRequest("You cannot change your own role".into()));
    }
    let conn = pool.get()?;
    let rows = conn.execute(
        "UPDATE users SET role = ?1 WHERE id = ?2",
        params![role.as_str(), target_id],
    )?;
    if rows == 0 {
        return Err(AppError::NotFound);
    }
    tracing::info!("User {} set role of {} to {}", acting_user_id, target_id, role);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use tempfile::TempDir;

    fn pool() -> (DbPool, TempDir) {
        let tmp = TempDir::new().unwrap();
        let pool = db::create_pool(&tmp.path().join("test.db")).unwrap();
        db::run_migrations(&pool).unwrap();
        (pool, tmp)
    }

    #[test]
    fn first_account_is_root_then_users() {
        let (pool, _tmp) = pool();
        let first = register(&pool, "alice", "password1", None, true).unwrap();
        let second = register(&pool, "bob", "password2", Some(" Bob "), true).unwrap();
        assert_eq!(first.role, Role::Root);
        assert_eq!(second.role, Role::User);
        assert_eq!(second.display_name.as_deref(), Some("Bob"));
        assert_eq!(user_count(&pool).unwrap(), 2);
    }

    #[test]
    fn closed_signup_still_allows_first_account() {
        let (pool, _tmp) = pool();
        register(&pool, "alice", "password1", None, false).unwrap();
        assert!(matches!(
            register(&pool, "bob", "password2", None, false),
            Err(AppError::Forbidden)
        ));
    }

    #[test]
    fn username_rules() {
        let (pool, _tmp) = pool();
        assert!(register(&pool, "ab", "password1", None, true).is_err());
        assert!(register(&pool, "has space", "password1", None, true).is_err());
        assert!(register(&pool, "carol", "short", None, true).is_err());
        register(&pool, "carol", "password1", None, true).unwrap();
        assert!(register(&pool, "CAROL", "password1", None, true).is_err());
    }

    #[test]
    fn authenticate_checks_password() {
        let (pool, _tmp) = pool();
        register(&pool, "alice", "correct horse", None, true).unwrap();
        assert!(authenticate(&pool, "alice", "correct horse").unwrap().is_some());
        assert!(authenticate(&pool, "Alice", "correct horse").unwrap().is_some());
        assert!(authenticate(&pool, "alice", "wrong").unwrap().is_none());
        assert!(authenticate(&pool, "nobody", "correct horse").unwrap().is_none());
    }

    #[test]
    fn set_role_rules() {
        let (pool, _tmp) = pool();
        let root = register(&pool, "root", "password1", None, true).unwrap();
        let user = register(&pool, "mod", "password1", None, true).unwrap();

        set_role(&pool, &root.id, &user.id, Role::Admin).unwrap();
        let updated = find_by_username(&pool, "mod").unwrap().unwrap();
        assert_eq!(updated.role, Role::Admin);

        assert!(set_role(&pool, &root.id, &root.id, Role::User).is_err());
        assert!(matches!(
            set_role(&pool, &root.id, "missing", Role::User),
            Err(AppError::NotFound)
        ));
        assert_eq!(list_users(&pool).unwrap().len(), 2);
    }
}
