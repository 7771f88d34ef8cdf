use rusqlite::{params, OptionalExtension, Row};
use tracing::debug;

use super::address::address_from_row;
use super::{fetch_failed, read_bool, read_date, Store};
use crate::dates::{format_stored, DatePolicy};
use crate::error::{StoreError, StoreResult};
use crate::models::{RecordId, Tenancy};

const ENTITY: &str = "tenancy";

// Address columns start at index 10 and are all NULL when the tenancy has
// no address or its address was deleted.
const SELECT_TENANCY: &str = "SELECT t.id, t.name, t.contact, t.leaseStartDate, t.leaseAgreementSigned,
        t.advanceAmount, t.agreedRent, t.monthlyDueDate, t.agreementSignedDate, t.comments,
        a.id, a.title, a.line1, a.line2, a.city, a.state, a.pinCode
     FROM tenancies t
     LEFT JOIN addresses a ON a.id = t.addressId";

fn tenancy_from_row(row: &Row<'_>, policy: DatePolicy) -> rusqlite::Result<Tenancy> {
    let linked: Option<i64> = row.get(10)?;
    let address = match linked {
        Some(_) => Some(address_from_row(row, 10)?),
        None => None,
    };

    Ok(Tenancy {
        id: RecordId::Saved(row.get(0)?),
        name: row.get(1)?,
        contact: row.get(2)?,
        address,
        lease_start_date: read_date(row, 3, policy)?,
        lease_agreement_signed: read_bool(row, 4)?,
        advance_amount: row.get(5)?,
        agreed_rent: row.get(6)?,
        monthly_due_date: row.get(7)?,
        agreement_signed_date: read_date(row, 8, policy)?,
        comments: row.get(9)?,
    })
}

impl Store {
    /// Inserts the tenancy and writes the new id back into it.
    pub fn save_tenancy(&self, tenancy: &mut Tenancy) -> StoreResult<i64> {
        tenancy.validate()?;
        self.conn()
            .execute(
                "INSERT INTO tenancies (name, contact, addressId, leaseStartDate, leaseAgreementSigned,
                    advanceAmount, agreedRent, monthlyDueDate, agreementSignedDate, comments)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    tenancy.name,
                    tenancy.contact,
                    tenancy.address_id(),
                    format_stored(&tenancy.lease_start_date),
                    tenancy.lease_agreement_signed,
                    tenancy.advance_amount,
                    tenancy.agreed_rent,
                    tenancy.monthly_due_date,
                    format_stored(&tenancy.agreement_signed_date),
                    tenancy.comments
                ],
            )
            .map_err(|source| StoreError::SaveFailed { entity: ENTITY, source })?;

        let id = self.conn().last_insert_rowid();
        tenancy.id = RecordId::Saved(id);
        debug!(tenancy_id = id, "saved tenancy");
        Ok(id)
    }

    pub fn update_tenancy(&self, tenancy: &Tenancy) -> StoreResult<()> {
        let id = tenancy.id.require(ENTITY)?;
        tenancy.validate()?;
        let changed = self
            .conn()
            .execute(
                "UPDATE tenancies SET name = ?1, contact = ?2, addressId = ?3, leaseStartDate = ?4,
                    leaseAgreementSigned = ?5, advanceAmount = ?6, agreedRent = ?7, monthlyDueDate = ?8,
                    agreementSignedDate = ?9, comments = ?10
                 WHERE id = ?11",
                params![
                    tenancy.name,
                    tenancy.contact,
                    tenancy.address_id(),
                    format_stored(&tenancy.lease_start_date),
                    tenancy.lease_agreement_signed,
                    tenancy.advance_amount,
                    tenancy.agreed_rent,
                    tenancy.monthly_due_date,
                    format_stored(&tenancy.agreement_signed_date),
                    tenancy.comments,
                    id
                ],
            )
            .map_err(|source| StoreError::UpdateFailed { entity: ENTITY, id, source })?;

        if changed == 0 {
            return Err(StoreError::UpdateFailed {
                entity: ENTITY,
                id,
                source: rusqlite::Error::QueryReturnedNoRows,
            });
        }
        Ok(())
    }

    /// Deletes a tenancy. Fails while rent payments still reference it.
    pub fn delete_tenancy(&self, id: i64) -> StoreResult<()> {
        self.conn()
            .execute("DELETE FROM tenancies WHERE id = ?1", params![id])
            .map_err(|source| StoreError::DeleteFailed { entity: ENTITY, id, source })?;
        debug!(tenancy_id = id, "deleted tenancy");
        Ok(())
    }

    pub fn get_all_tenancies(&self) -> StoreResult<Vec<Tenancy>> {
        let policy = self.date_policy();
        let mut stmt = self
            .conn()
            .prepare(&format!("{SELECT_TENANCY} ORDER BY t.id"))
            .map_err(fetch_failed(ENTITY))?;

        let rows = stmt
            .query_map([], |row| tenancy_from_row(row, policy))
            .map_err(fetch_failed(ENTITY))?;

        let mut tenancies = Vec::new();
        for row in rows {
            tenancies.push(row.map_err(fetch_failed(ENTITY))?);
        }

        Ok(tenancies)
    }

    pub fn get_tenancy(&self, id: i64) -> StoreResult<Option<Tenancy>> {
        let policy = self.date_policy();
        self.conn()
            .query_row(&format!("{SELECT_TENANCY} WHERE t.id = ?1"), [id], |row| {
                tenancy_from_row(row, policy)
            })
            .optional()
            .map_err(fetch_failed(ENTITY))
    }
}
