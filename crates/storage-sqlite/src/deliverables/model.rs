//! Database models for deliverables.

use chrono::NaiveDateTime;
use diesel::prelude::*;

use dealgate_core::deliverables::{Deliverable, DeliverableStatus, NewDeliverable};
use dealgate_core::errors::{Error, Result};

use crate::errors::corrupt;

#[derive(Queryable, Identifiable, Selectable, PartialEq, Debug, Clone)]
#[diesel(table_name = crate::schema::deliverables)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct DeliverableDB {
    pub id: i64,
    pub deal_id: i64,
    pub user_id: i64,
    pub item_ref: String,
    pub status: String,
    pub price_cents: i64,
    pub transaction_id: Option<i64>,
    pub content: Option<String>,
    pub error_message: Option<String>,
    pub attempts: i32,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub completed_at: Option<NaiveDateTime>,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = crate::schema::deliverables)]
pub struct NewDeliverableDB {
    pub deal_id: i64,
    pub user_id: i64,
    pub item_ref: String,
    pub status: String,
    pub price_cents: i64,
    pub transaction_id: Option<i64>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl NewDeliverableDB {
    pub fn queued(
        new_deliverable: NewDeliverable,
        transaction_id: Option<i64>,
        now: NaiveDateTime,
    ) -> Self {
        Self {
            deal_id: new_deliverable.deal_id,
            user_id: new_deliverable.user_id,
            item_ref: new_deliverable.item_ref,
            status: DeliverableStatus::Queued.as_str().to_string(),
            price_cents: new_deliverable.price_cents,
            transaction_id,
            created_at: now,
            updated_at: now,
        }
    }
}

impl TryFrom<DeliverableDB> for Deliverable {
    type Error = Error;

    fn try_from(db: DeliverableDB) -> Result<Self> {
        Ok(Self {
            id: db.id,
            deal_id: db.deal_id,
            user_id: db.user_id,
            item_ref: db.item_ref,
            status: db
                .status
                .parse()
                .map_err(|e| corrupt("deliverables", "status", e))?,
            price_cents: db.price_cents,
            transaction_id: db.transaction_id,
            content: db.content,
            error_message: db.error_message,
            attempts: db.attempts,
            created_at: db.created_at,
            updated_at: db.updated_at,
            completed_at: db.completed_at,
        })
    }
}
