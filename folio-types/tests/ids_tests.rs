use folio_types::{ClientId, DocumentId, TransactionId};
use std::collections::HashSet;
use std::str::FromStr;

// ── ClientId ──────────────────────────────────────────────────────

#[test]
fn client_id_new_is_unique() {
    let a = ClientId::new();
    let b = ClientId::new();
    assert_ne!(a, b);
}

#[test]
fn client_id_from_uuid_roundtrip() {
    let uuid = uuid::Uuid::now_v7();
    let id = ClientId::from_uuid(uuid);
    assert_eq!(id.as_uuid(), uuid);
}

#[test]
fn client_id_display_and_parse() {
    let id = ClientId::new();
    let parsed = ClientId::parse(&id.to_string()).unwrap();
    assert_eq!(id, parsed);
}

#[test]
fn client_id_parse_invalid() {
    assert!(ClientId::parse("not-a-uuid").is_err());
    assert!(ClientId::from_str("garbage").is_err());
}

#[test]
fn client_id_from_u128_orders_numerically() {
    let one = ClientId::from_u128(1);
    let two = ClientId::from_u128(2);
    assert!(one < two);
    assert_eq!(ClientId::from_u128(7), ClientId::from_u128(7));
}

#[test]
fn client_ids_minted_later_sort_later() {
    let first = ClientId::new();
    std::thread::sleep(std::time::Duration::from_millis(2));
    let second = ClientId::new();
    assert!(first < second);
}

#[test]
fn client_id_serializes_as_plain_string() {
    let id = ClientId::from_u128(42);
    let json = serde_json::to_string(&id).unwrap();
    assert_eq!(json, format!("\"{}\"", id));
    let back: ClientId = serde_json::from_str(&json).unwrap();
    assert_eq!(back, id);
}

// ── DocumentId / TransactionId ───────────────────────────────────

#[test]
fn document_id_hash_and_eq() {
    let id = DocumentId::new();
    let mut set = HashSet::new();
    set.insert(id);
    set.insert(id);
    assert_eq!(set.len(), 1);
}

#[test]
fn transaction_id_default_is_unique() {
    let a = TransactionId::default();
    let b = TransactionId::default();
    assert_ne!(a, b);
}

#[test]
fn transaction_id_from_str() {
    let id = TransactionId::new();
    let parsed: TransactionId = id.to_string().parse().unwrap();
    assert_eq!(id, parsed);
}
