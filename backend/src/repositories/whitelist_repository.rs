use diesel::prelude::*;
use serde::Serialize;
use crate::{error::AppError, schema::bot_whitelist, DbPool};

#[derive(Queryable, Selectable, Serialize, Clone, Debug, PartialEq)]
#[diesel(table_name = bot_whitelist)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct WhitelistEntry {
    pub chat_id: i64,
    pub added_at: i64,
}

#[derive(Debug, PartialEq)]
pub enum RemoveOutcome {
    Removed,
    NotListed,
    /// Refused so the list never goes empty.
    LastEntry,
}

/// Telegram ids allowed to use the bot. The same ids receive lead notifications.
pub struct WhitelistRepository {
    pool: DbPool,
}

impl WhitelistRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Fills an empty whitelist, usually from `TELEGRAM_CHAT_IDS` on first start.
    /// Once the list has entries it belongs to the admins and is left alone.
    pub fn seed(&self, chat_ids: &[i64], now: i64) -> Result<usize, AppError> {
        let mut conn = self.pool.get()?;
        let inserted = conn.transaction::<_, diesel::result::Error, _>(|conn| {
            let existing = bot_whitelist::table.count().get_result::<i64>(conn)?;
            if existing > 0 {
                return Ok(0);
            }
            insert_ids(conn, chat_ids, now)
        })?;
        Ok(inserted)
    }

    pub fn list(&self) -> Result<Vec<WhitelistEntry>, AppError> {
        let mut conn = self.pool.get()?;
        let entries = bot_whitelist::table
            .order((bot_whitelist::added_at.asc(), bot_whitelist::chat_id.asc()))
            .select(WhitelistEntry::as_select())
            .load(&mut conn)?;
        Ok(entries)
    }

    pub fn chat_ids(&self) -> Result<Vec<i64>, AppError> {
        Ok(self.list()?.into_iter().map(|entry| entry.chat_id).collect())
    }

    /// Swaps the whole list. Ids that stay keep their `added_at`.
    pub fn replace(&self, chat_ids: &[i64], now: i64) -> Result<(), AppError> {
        if chat_ids.is_empty() {
            return Err(AppError::BadRequest("The whitelist cannot be empty".to_string()));
        }
        let mut conn = self.pool.get()?;
        conn.transaction::<_, diesel::result::Error, _>(|conn| {
            diesel::delete(bot_whitelist::table.filter(bot_whitelist::chat_id.ne_all(chat_ids))).execute(conn)?;
            insert_ids(conn, chat_ids, now)?;
            Ok(())
        })?;
        Ok(())
    }

    pub fn remove(&self, chat_id: i64) -> Result<RemoveOutcome, AppError> {
        let mut conn = self.pool.get()?;
        let outcome = conn.transaction::<_, diesel::result::Error, _>(|conn| {
            let listed = bot_whitelist::table.find(chat_id).count().get_result::<i64>(conn)? > 0;
            if !listed {
                return Ok(RemoveOutcome::NotListed);
            }
            if bot_whitelist::table.count().get_result::<i64>(conn)? <= 1 {
                return Ok(RemoveOutcome::LastEntry);
            }
            diesel::delete(bot_whitelist::table.find(chat_id)).execute(conn)?;
            Ok(RemoveOutcome::Removed)
        })?;
        Ok(outcome)
    }

    pub fn contains(&self, chat_id: i64) -> Result<bool, AppError> {
        let mut conn = self.pool.get()?;
        let count = bot_whitelist::table
            .find(chat_id)
            .count()
            .get_result::<i64>(&mut conn)?;
        Ok(count > 0)
    }
}

fn insert_ids(conn: &mut SqliteConnection, chat_ids: &[i64], now: i64) -> Result<usize, diesel::result::Error> {
    let mut inserted = 0;
    for chat_id in chat_ids {
        inserted += diesel::insert_or_ignore_into(bot_whitelist::table)
            .values((bot_whitelist::chat_id.eq(*chat_id), bot_whitelist::added_at.eq(now)))
            .execute(conn)?;
    }
    Ok(inserted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::lead_repository::tests::memory_pool;

    #[test]
    fn seeding_only_fills_an_empty_list() {
        let repo = WhitelistRepository::new(memory_pool());
        assert_eq!(repo.seed(&[101, 202, 101], 1).unwrap(), 2);
        assert_eq!(repo.seed(&[303], 2).unwrap(), 0);
        assert_eq!(repo.chat_ids().unwrap(), vec![101, 202]);
        assert!(repo.contains(202).unwrap());
        assert!(!repo.contains(303).unwrap());
    }

    #[test]
    fn replace_keeps_surviving_rows() {
        let repo = WhitelistRepository::new(memory_pool());
        repo.seed(&[101, 202], 1).unwrap();
        repo.replace(&[202, -1001], 5).unwrap();
        assert_eq!(
            repo.list().unwrap(),
            vec![
                WhitelistEntry { chat_id: 202, added_at: 1 },
                WhitelistEntry { chat_id: -1001, added_at: 5 },
            ]
        );
        assert!(matches!(repo.replace(&[], 6), Err(AppError::BadRequest(_))));
        assert_eq!(repo.chat_ids().unwrap().len(), 2);
    }

    #[test]
    fn remove_never_empties_the_list() {
        let repo = WhitelistRepository::new(memory_pool());
        repo.seed(&[101, 202], 1).unwrap();
        assert_eq!(repo.remove(303).unwrap(), RemoveOutcome::NotListed);
        assert_eq!(repo.remove(101).unwrap(), RemoveOutcome::Removed);
        assert_eq!(repo.remove(202).unwrap(), RemoveOutcome::LastEntry);
        assert_eq!(repo.chat_ids().unwrap(), vec![202]);
    }
}
