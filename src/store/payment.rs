use rusqlite::{params, OptionalExtension, Row};
use tracing::debug;

use super::{fetch_failed, read_date, Store};
use crate::dates::{format_stored, DatePolicy};
use crate::error::{StoreError, StoreResult};
use crate::models::{RecordId, RentPayment};

const ENTITY: &str = "rent payment";

const SELECT_PAYMENT: &str = "SELECT id, tenancyId, amount, paidOn, notes FROM rent_payments";

// Same-second payments fall back to insertion order.
const NEWEST_FIRST: &str = "ORDER BY paidOn DESC, id DESC";

fn payment_from_row(row: &Row<'_>, policy: DatePolicy) -> rusqlite::Result<RentPayment> {
    Ok(RentPayment {
        id: RecordId::Saved(row.get(0)?),
        tenancy_id: row.get(1)?,
        amount: row.get(2)?,
        paid_on: read_date(row, 3, policy)?,
        notes: row.get(4)?,
    })
}

impl Store {
    /// Appends a payment to the tenancy's ledger. Payments are never
    /// updated or deleted.
    pub fn save_rent_payment(&self, payment: &mut RentPayment) -> StoreResult<i64> {
        payment.validate()?;
        self.conn()
            .execute(
                "INSERT INTO rent_payments (tenancyId, amount, paidOn, notes) VALUES (?1, ?2, ?3, ?4)",
                params![
                    payment.tenancy_id,
                    payment.amount,
                    format_stored(&payment.paid_on),
                    payment.notes
                ],
            )
            .map_err(|source| StoreError::SaveFailed { entity: ENTITY, source })?;

        let id = self.conn().last_insert_rowid();
        payment.id = RecordId::Saved(id);
        debug!(payment_id = id, tenancy_id = payment.tenancy_id, "saved rent payment");
        Ok(id)
    }

    pub fn get_latest_rent_payment(&self, tenancy_id: i64) -> StoreResult<Option<RentPayment>> {
        let policy = self.date_policy();
        self.conn()
            .query_row(
                &format!("{SELECT_PAYMENT} WHERE tenancyId = ?1 {NEWEST_FIRST} LIMIT 1"),
                [tenancy_id],
                |row| payment_from_row(row, policy),
            )
            .optional()
            .map_err(fetch_failed(ENTITY))
    }

    pub fn get_rent_payments(&self, tenancy_id: i64) -> StoreResult<Vec<RentPayment>> {
        self.collect_payments(
            &format!("{SELECT_PAYMENT} WHERE tenancyId = ?1 {NEWEST_FIRST}"),
            &[&tenancy_id],
        )
    }

    pub fn get_all_rent_payments(&self) -> StoreResult<Vec<RentPayment>> {
        self.collect_payments(&format!("{SELECT_PAYMENT} {NEWEST_FIRST}"), &[])
    }

    /// The most recent payment of every tenancy that has at least one,
    /// ordered by tenancy id.
    pub fn get_latest_rent_payments(&self) -> StoreResult<Vec<RentPayment>> {
        self.collect_payments(
            "SELECT p.id, p.tenancyId, p.amount, p.paidOn, p.notes FROM rent_payments p
             WHERE p.id = (
               SELECT latest.id FROM rent_payments latest
               WHERE latest.tenancyId = p.tenancyId
               ORDER BY latest.paidOn DESC, latest.id DESC
               LIMIT 1
             )
             ORDER BY p.tenancyId",
            &[],
        )
    }

    fn collect_payments(&self, sql: &str, args: &[&dyn rusqlite::ToSql]) -> StoreResult<Vec<RentPayment>> {
        let policy = self.date_policy();
        let mut stmt = self.conn().prepare(sql).map_err(fetch_failed(ENTITY))?;

        let rows = stmt
            .query_map(args, |row| payment_from_row(row, policy))
            .map_err(fetch_failed(ENTITY))?;

        let mut payments = Vec::new();
        for row in rows {
            payments.push(row.map_err(fetch_failed(ENTITY))?);
        }

        Ok(payments)
    }
}
