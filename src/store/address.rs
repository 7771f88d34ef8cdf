use rusqlite::{params, OptionalExtension, Row};
use tracing::debug;

use super::{fetch_failed, Store};
use crate::error::{StoreError, StoreResult};
use crate::models::{Address, RecordId};

const ENTITY: &str = "address";

const SELECT_ADDRESS: &str = "SELECT id, title, line1, line2, city, state, pinCode FROM addresses";

pub(crate) fn address_from_row(row: &Row<'_>, offset: usize) -> rusqlite::Result<Address> {
    Ok(Address {
        id: RecordId::Saved(row.get(offset)?),
        title: row.get(offset + 1)?,
        line1: row.get(offset + 2)?,
        line2: row.get(offset + 3)?,
        city: row.get(offset + 4)?,
        state: row.get(offset + 5)?,
        pin_code: row.get(offset + 6)?,
    })
}

impl Store {
    /// Inserts the address and writes the new id back into it.
    pub fn save_address(&self, address: &mut Address) -> StoreResult<i64> {
        self.conn()
            .execute(
                "INSERT INTO addresses (title, line1, line2, city, state, pinCode) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    address.title,
                    address.line1,
                    address.line2,
                    address.city,
                    address.state,
                    address.pin_code
                ],
            )
            .map_err(|source| StoreError::SaveFailed { entity: ENTITY, source })?;

        let id = self.conn().last_insert_rowid();
        address.id = RecordId::Saved(id);
        debug!(address_id = id, "saved address");
        Ok(id)
    }

    pub fn update_address(&self, address: &Address) -> StoreResult<()> {
        let id = address.id.require(ENTITY)?;
        let changed = self
            .conn()
            .execute(
                "UPDATE addresses SET title = ?1, line1 = ?2, line2 = ?3, city = ?4, state = ?5, pinCode = ?6 WHERE id = ?7",
                params![
                    address.title,
                    address.line1,
                    address.line2,
                    address.city,
                    address.state,
                    address.pin_code,
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

    /// Deletes the address. Tenancies that reference it keep the stale id.
    pub fn delete_address(&self, id: i64) -> StoreResult<()> {
        self.conn()
            .execute("DELETE FROM addresses WHERE id = ?1", params![id])
            .map_err(|source| StoreError::DeleteFailed { entity: ENTITY, id, source })?;
        debug!(address_id = id, "deleted address");
        Ok(())
    }

    pub fn get_all_addresses(&self) -> StoreResult<Vec<Address>> {
        let mut stmt = self
            .conn()
            .prepare(&format!("{SELECT_ADDRESS} ORDER BY id"))
            .map_err(fetch_failed(ENTITY))?;

        let rows = stmt
            .query_map([], |row| address_from_row(row, 0))
            .map_err(fetch_failed(ENTITY))?;

        let mut addresses = Vec::new();
        for row in rows {
            addresses.push(row.map_err(fetch_failed(ENTITY))?);
        }

        Ok(addresses)
    }

    pub fn get_address(&self, id: i64) -> StoreResult<Option<Address>> {
        self.conn()
            .query_row(&format!("{SELECT_ADDRESS} WHERE id = ?1"), [id], |row| {
                address_from_row(row, 0)
            })
            .optional()
            .map_err(fetch_failed(ENTITY))
    }
}

#[cfg(test)]
mod tests {
    use crate::dates::DatePolicy;
    use crate::error::StoreError;
    use crate::models::{Address, RecordId};
    use crate::store::Store;

    fn setup_store() -> Store {
        Store::open_in_memory(DatePolicy::Lenient).expect("open in-memory")
    }

    fn sample_address(title: &str) -> Address {
        Address {
            title: title.to_string(),
            line1: "12 MG Road".to_string(),
            line2: "Flat 3B".to_string(),
            city: "Bengaluru".to_string(),
            state: "KA".to_string(),
            pin_code: "560001".to_string(),
            ..Address::default()
        }
    }

    #[test]
    fn save_assigns_id_and_reads_back() {
        let store = setup_store();
        let mut address = sample_address("Home");

        let id = store.save_address(&mut address).expect("save");
        assert_eq!(address.id, RecordId::Saved(id));

        let fetched = store.get_address(id).expect("get").expect("present");
        assert_eq!(fetched, address);
    }

    #[test]
    fn update_requires_saved_id() {
        let store = setup_store();
        let address = sample_address("Unsaved");
        assert!(matches!(
            store.update_address(&address),
            Err(StoreError::InvalidId { .. })
        ));
    }

    #[test]
    fn update_of_missing_row_fails() {
        let store = setup_store();
        let mut address = sample_address("Ghost");
        address.id = RecordId::Saved(99);
        assert!(matches!(
            store.update_address(&address),
            Err(StoreError::UpdateFailed { id: 99, .. })
        ));
    }

    #[test]
    fn update_and_delete() {
        let store = setup_store();
        let mut address = sample_address("Old title");
        let id = store.save_address(&mut address).expect("save");

        address.title = "New title".to_string();
        store.update_address(&address).expect("update");
        assert_eq!(
            store.get_address(id).expect("get").expect("present").title,
            "New title"
        );

        store.delete_address(id).expect("delete");
        assert!(store.get_address(id).expect("get").is_none());
        assert!(store.get_all_addresses().expect("list").is_empty());
    }

    #[test]
    fn list_is_ordered_by_id() {
        let store = setup_store();
        for title in ["A", "B", "C"] {
            store.save_address(&mut sample_address(title)).expect("save");
        }
        let titles: Vec<String> = store
            .get_all_addresses()
            .expect("list")
            .into_iter()
            .map(|address| address.title)
            .collect();
        assert_eq!(titles, vec!["A", "B", "C"]);
    }
}
