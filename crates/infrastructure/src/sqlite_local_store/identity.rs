//! User, group, and permission persistence.

use chrono::{DateTime, Utc};

use dolimirror_core::AppResult;
use dolimirror_domain::{Group, Permission, User};

use super::{SqliteLocalStore, decode_json, storage_error};

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: i64,
    login: String,
    firstname: String,
    lastname: String,
    email: String,
    admin: bool,
    active: bool,
    groups_json: String,
    permissions_json: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    last_login: Option<DateTime<Utc>>,
}

impl UserRow {
    fn into_user(self) -> AppResult<User> {
        Ok(User {
            id: self.id,
            login: self.login,
            firstname: self.firstname,
            lastname: self.lastname,
            email: self.email,
            admin: self.admin,
            active: self.active,
            groups: decode_json(&self.groups_json, "users.groups_json")?,
            permissions: decode_json(&self.permissions_json, "users.permissions_json")?,
            created_at: self.created_at,
            updated_at: self.updated_at,
            last_login: self.last_login,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct GroupRow {
    id: i64,
    name: String,
    description: Option<String>,
    permissions_json: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl GroupRow {
    fn into_group(self) -> AppResult<Group> {
        Ok(Group {
            id: self.id,
            name: self.name,
            description: self.description,
            permissions: decode_json(&self.permissions_json, "groups.permissions_json")?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct PermissionRow {
    name: String,
    module: String,
    description: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<PermissionRow> for Permission {
    fn from(row: PermissionRow) -> Self {
        Self {
            name: row.name,
            module: row.module,
            description: row.description,
            created_at: row.created_at,
        }
    }
}

const SELECT_USER: &str = "SELECT id, login, firstname, lastname, email, admin, active, \
     groups_json, permissions_json, created_at, updated_at, last_login FROM users";

impl SqliteLocalStore {
    pub(super) async fn users_impl(&self) -> AppResult<Vec<User>> {
        let sql = format!("{SELECT_USER} ORDER BY id");
        let rows = sqlx::query_as::<_, UserRow>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(storage_error("list users"))?;

        rows.into_iter().map(UserRow::into_user).collect()
    }

    pub(super) async fn user_impl(&self, id: i64) -> AppResult<Option<User>> {
        let sql = format!("{SELECT_USER} WHERE id = ?");
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_error("find user"))?;

        row.map(UserRow::into_user).transpose()
    }

    pub(super) async fn user_by_login_impl(&self, login: &str) -> AppResult<Option<User>> {
        let sql = format!("{SELECT_USER} WHERE login = ?");
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(login)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_error("find user by login"))?;

        row.map(UserRow::into_user).transpose()
    }

    pub(super) async fn upsert_user_impl(&self, user: &User) -> AppResult<()> {
        let now = Utc::now();
        let groups_json = serde_json::to_string(&user.groups).unwrap_or_else(|_| "[]".to_owned());
        let permissions_json =
            serde_json::to_string(&user.permissions).unwrap_or_else(|_| "[]".to_owned());

        sqlx::query(
            r#"
            INSERT INTO users (id, login, firstname, lastname, email, admin, active,
                               groups_json, permissions_json, created_at, updated_at, last_login)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (id) DO UPDATE SET
                login = excluded.login,
                firstname = excluded.firstname,
                lastname = excluded.lastname,
                email = excluded.email,
                admin = excluded.admin,
                active = excluded.active,
                groups_json = excluded.groups_json,
                permissions_json = excluded.permissions_json,
                updated_at = excluded.updated_at,
                last_login = excluded.last_login
            "#,
        )
        .bind(user.id)
        .bind(&user.login)
        .bind(&user.firstname)
        .bind(&user.lastname)
        .bind(&user.email)
        .bind(user.admin)
        .bind(user.active)
        .bind(groups_json)
        .bind(permissions_json)
        .bind(now)
        .bind(now)
        .bind(user.last_login)
        .execute(&self.pool)
        .await
        .map_err(storage_error("upsert user"))?;

        Ok(())
    }

    pub(super) async fn delete_user_impl(&self, id: i64) -> AppResult<()> {
        sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(storage_error("delete user"))?;

        Ok(())
    }

    pub(super) async fn groups_impl(&self) -> AppResult<Vec<Group>> {
        let rows = sqlx::query_as::<_, GroupRow>(
            "SELECT id, name, description, permissions_json, created_at, updated_at \
             FROM groups ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(storage_error("list groups"))?;

        rows.into_iter().map(GroupRow::into_group).collect()
    }

    pub(super) async fn group_impl(&self, id: i64) -> AppResult<Option<Group>> {
        let row = sqlx::query_as::<_, GroupRow>(
            "SELECT id, name, description, permissions_json, created_at, updated_at \
             FROM groups WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_error("find group"))?;

        row.map(GroupRow::into_group).transpose()
    }

    pub(super) async fn upsert_group_impl(&self, group: &Group) -> AppResult<()> {
        let now = Utc::now();
        let permissions_json =
            serde_json::to_string(&group.permissions).unwrap_or_else(|_| "[]".to_owned());

        sqlx::query(
            r#"
            INSERT INTO groups (id, name, description, permissions_json, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT (id) DO UPDATE SET
                name = excluded.name,
                description = excluded.description,
                permissions_json = excluded.permissions_json,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(group.id)
        .bind(&group.name)
        .bind(&group.description)
        .bind(permissions_json)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(storage_error("upsert group"))?;

        Ok(())
    }

    pub(super) async fn delete_group_impl(&self, id: i64) -> AppResult<()> {
        sqlx::query("DELETE FROM groups WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(storage_error("delete group"))?;

        Ok(())
    }

    pub(super) async fn permissions_impl(&self) -> AppResult<Vec<Permission>> {
        let rows = sqlx::query_as::<_, PermissionRow>(
            "SELECT name, module, description, created_at FROM permissions ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(storage_error("list permissions"))?;

        Ok(rows.into_iter().map(Permission::from).collect())
    }

    pub(super) async fn permissions_by_module_impl(
        &self,
        module: &str,
    ) -> AppResult<Vec<Permission>> {
        let rows = sqlx::query_as::<_, PermissionRow>(
            "SELECT name, module, description, created_at FROM permissions \
             WHERE module = ? ORDER BY name",
        )
        .bind(module)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_error("list permissions by module"))?;

        Ok(rows.into_iter().map(Permission::from).collect())
    }

    pub(super) async fn insert_permissions_impl(&self, rows: &[Permission]) -> AppResult<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(storage_error("begin permission insert"))?;

        for row in rows {
            sqlx::query(
                "INSERT INTO permissions (name, module, description, created_at) \
                 VALUES (?, ?, ?, ?) ON CONFLICT (name) DO NOTHING",
            )
            .bind(&row.name)
            .bind(&row.module)
            .bind(&row.description)
            .bind(row.created_at)
            .execute(&mut *tx)
            .await
            .map_err(storage_error("insert permission"))?;
        }

        tx.commit()
            .await
            .map_err(storage_error("commit permission insert"))?;

        Ok(())
    }
}
