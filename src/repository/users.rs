use chrono::NaiveDateTime;
use diesel::prelude::*;

use crate::models::user::{NewUser, User};
use crate::repository::database::{Database, RepositoryError};
use crate::repository::schema::users;

impl Database {
    pub fn find_user_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError> {
        let mut conn = self.conn()?;
        let user = users::table
            .filter(users::email.eq(email))
            .select(User::as_select())
            .first(&mut conn)
            .optional()?;
        Ok(user)
    }

    pub fn find_user_by_id(&self, user_id: &str) -> Result<Option<User>, RepositoryError> {
        let mut conn = self.conn()?;
        let user = users::table
            .find(user_id)
            .select(User::as_select())
            .first(&mut conn)
            .optional()?;
        Ok(user)
    }

    pub fn insert_user(&self, user: &NewUser) -> Result<User, RepositoryError> {
        let mut conn = self.conn()?;
        let user = diesel::insert_into(users::table)
            .values(user)
            .returning(User::as_returning())
            .get_result(&mut conn)?;
        tracing::info!(user_id = %user.id, "created user");
        Ok(user)
    }

    pub fn record_login(&self, user_id: &str, at: NaiveDateTime) -> Result<bool, RepositoryError> {
        let mut conn = self.conn()?;
        let updated = diesel::update(users::table.find(user_id))
            .set(users::last_login_at.eq(Some(at)))
            .execute(&mut conn)?;
        Ok(updated > 0)
    }

    pub fn update_profile(
        &self,
        user_id: &str,
        first_name: &str,
        last_name: &str,
    ) -> Result<bool, RepositoryError> {
        let mut conn = self.conn()?;
        let updated = diesel::update(users::table.find(user_id))
            .set((users::first_name.eq(first_name), users::last_name.eq(last_name)))
            .execute(&mut conn)?;
        Ok(updated > 0)
    }

    pub fn update_password_hash(&self, user_id: &str, hash: &str) -> Result<bool, RepositoryError> {
        let mut conn = self.conn()?;
        let updated = diesel::update(users::table.find(user_id))
            .set(users::password_hash.eq(hash))
            .execute(&mut conn)?;
        Ok(updated > 0)
    }
}
