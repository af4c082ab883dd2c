use crate::db::models::ChatMessageRecord;
use crate::errors::Error;
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;

/// Repository for the chat history table
pub struct ChatRepository<'a> {
    pub conn: &'a mut SqliteConnection,
}

impl<'a> ChatRepository<'a> {
    pub fn new(conn: &'a mut SqliteConnection) -> Self {
        ChatRepository { conn }
    }

    pub fn insert_message(&mut self, record: &ChatMessageRecord) -> Result<(), Error> {
        use crate::schema::chat_messages;

        diesel::insert_into(chat_messages::table)
            .values(record)
            .execute(self.conn)?;
        Ok(())
    }

    /// All stored messages, oldest first
    pub fn list_messages(&mut self) -> Result<Vec<ChatMessageRecord>, Error> {
        use crate::schema::chat_messages::dsl::*;

        let records = chat_messages
            .order(created_at.asc())
            .load::<ChatMessageRecord>(self.conn)?;
        Ok(records)
    }
}
