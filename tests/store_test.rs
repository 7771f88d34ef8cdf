use chrono::NaiveDateTime;
use tenancy_ledger::dates::parse_input;
use tenancy_ledger::db::DB_FILE_NAME;
use tenancy_ledger::due;
use tenancy_ledger::{Address, DatePolicy, DueDay, RecordId, RentPayment, Store, StoreError, Tenancy};

fn at(raw: &str) -> NaiveDateTime {
    parse_input(raw).expect("date")
}

fn sample_address() -> Address {
    Address {
        title: "Lake View".to_string(),
        line1: "12 MG Road".to_string(),
        city: "Bengaluru".to_string(),
        state: "Karnataka".to_string(),
        pin_code: "560001".to_string(),
        ..Address::default()
    }
}

fn sample_tenancy(address: Option<Address>) -> Tenancy {
    let mut tenancy = Tenancy::new("Asha Rao", 12500.0, DueDay::new(5).expect("due day"));
    tenancy.address = address;
    tenancy.lease_start_date = at("2024-01-01");
    tenancy.agreement_signed_date = at("2024-01-01");
    tenancy
}

#[test]
fn records_survive_reopening() {
    let dir = tempfile::tempdir().expect("tempdir");

    {
        let store = Store::open(dir.path(), DatePolicy::Lenient).expect("open");
        let mut address = sample_address();
        store.save_address(&mut address).expect("save address");
        let mut tenancy = sample_tenancy(Some(address));
        store.save_tenancy(&mut tenancy).expect("save tenancy");
        let mut payment = RentPayment::new(1, 12500.0);
        payment.paid_on = at("2024-02-05");
        store.save_rent_payment(&mut payment).expect("save payment");
    }

    assert!(dir.path().join(DB_FILE_NAME).exists());

    let store = Store::open(dir.path(), DatePolicy::Lenient).expect("reopen");
    let tenancy = store.get_tenancy(1).expect("fetch").expect("tenancy exists");
    assert_eq!(tenancy.name, "Asha Rao");
    assert_eq!(tenancy.address.as_ref().map(|a| a.city.as_str()), Some("Bengaluru"));
    assert_eq!(tenancy.lease_start_date, at("2024-01-01"));

    let latest = store.get_latest_rent_payment(1).expect("fetch").expect("payment");
    assert_eq!(latest.paid_on, at("2024-02-05"));
    assert_eq!(due::next_rent_due_date(&tenancy, Some(&latest)), at("2024-03-05"));
}

#[test]
fn first_cycle_runs_from_lease_start() {
    let store = Store::open_in_memory(DatePolicy::Lenient).expect("open");
    let mut tenancy = sample_tenancy(None);
    assert_eq!(store.save_tenancy(&mut tenancy).expect("save"), 1);

    let latest = store.get_latest_rent_payment(1).expect("fetch");
    assert!(latest.is_none());
    assert_eq!(due::next_rent_due_date(&tenancy, latest.as_ref()), at("2024-02-05"));
}

#[test]
fn deleted_address_leaves_tenancy_without_one() {
    let store = Store::open_in_memory(DatePolicy::Lenient).expect("open");
    let mut address = sample_address();
    let address_id = store.save_address(&mut address).expect("save address");
    let mut tenancy = sample_tenancy(Some(address));
    store.save_tenancy(&mut tenancy).expect("save tenancy");

    store.delete_address(address_id).expect("delete address");

    let tenancy = store.get_tenancy(1).expect("fetch").expect("tenancy exists");
    assert!(tenancy.address.is_none());
    assert!(store.get_address(address_id).expect("fetch").is_none());

    let all = store.get_all_tenancies().expect("fetch all");
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].id, RecordId::Saved(1));
    assert!(all[0].address.is_none());
}

#[test]
fn saved_payment_reads_back_unchanged() {
    let store = Store::open_in_memory(DatePolicy::Lenient).expect("open");
    let mut tenancy = sample_tenancy(None);
    let tenancy_id = store.save_tenancy(&mut tenancy).expect("save tenancy");

    let mut payment = RentPayment::new(tenancy_id, 12500.5);
    payment.paid_on = at("2024-02-05 09:30:15");
    payment.notes = "Paid by UPI, ref 4471".to_string();
    let id = store.save_rent_payment(&mut payment).expect("save payment");
    assert_eq!(payment.id, RecordId::Saved(id));

    let latest = store
        .get_latest_rent_payment(tenancy_id)
        .expect("fetch")
        .expect("payment");
    assert_eq!(latest, payment);
    assert_eq!(store.get_rent_payments(tenancy_id).expect("history"), vec![payment]);
}

#[test]
fn updating_missing_address_fails() {
    let store = Store::open_in_memory(DatePolicy::Lenient).expect("open");
    let mut address = sample_address();
    address.id = RecordId::Saved(42);
    assert!(matches!(
        store.update_address(&address),
        Err(StoreError::UpdateFailed { id: 42, .. })
    ));
}

#[test]
fn relocate_switches_to_fresh_database() {
    let first = tempfile::tempdir().expect("tempdir");
    let second = tempfile::tempdir().expect("tempdir");

    let mut store = Store::open(first.path(), DatePolicy::Lenient).expect("open");
    let mut tenancy = sample_tenancy(None);
    store.save_tenancy(&mut tenancy).expect("save");

    store.relocate(second.path()).expect("relocate");
    assert_eq!(store.location(), Some(second.path()));
    assert!(second.path().join(DB_FILE_NAME).exists());
    assert!(store.get_all_tenancies().expect("fetch").is_empty());

    let mut moved = sample_tenancy(None);
    assert_eq!(store.save_tenancy(&mut moved).expect("save"), 1);

    let original = Store::open(first.path(), DatePolicy::Lenient).expect("reopen first");
    assert_eq!(original.get_all_tenancies().expect("fetch").len(), 1);
}

#[test]
fn relocate_to_unusable_directory_keeps_store() {
    let dir = tempfile::tempdir().expect("tempdir");
    let blocker = dir.path().join("plain-file");
    std::fs::write(&blocker, b"x").expect("write");

    let mut store = Store::open(dir.path(), DatePolicy::Lenient).expect("open");
    assert!(store.relocate(&blocker.join("db")).is_err());
    assert_eq!(store.location(), Some(dir.path()));

    let mut tenancy = sample_tenancy(None);
    store.save_tenancy(&mut tenancy).expect("still usable");
}
