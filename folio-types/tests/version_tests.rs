use folio_types::{Error, Version};
use proptest::prelude::*;

#[test]
fn zero_is_default() {
    assert_eq!(Version::default(), Version::ZERO);
    assert_eq!(Version::ZERO.get(), 0);
}

#[test]
fn advance_counts_steps() {
    assert_eq!(Version::new(5).advance(1), Version::new(6));
    assert_eq!(Version::new(5).advance(0), Version::new(5));
}

#[test]
fn rewind_finds_batch_base() {
    assert_eq!(Version::new(6).rewind(1).unwrap(), Version::new(5));
}

#[test]
fn rewind_past_zero_is_error() {
    let err = Version::new(1).rewind(3).unwrap_err();
    assert!(matches!(err, Error::VersionUnderflow { version: 1, steps: 3 }));
}

#[test]
fn steps_since() {
    assert_eq!(Version::new(9).steps_since(Version::new(4)), Some(5));
    assert_eq!(Version::new(4).steps_since(Version::new(9)), None);
}

#[test]
fn display_and_serde() {
    let v = Version::new(17);
    assert_eq!(v.to_string(), "v17");
    assert_eq!(serde_json::to_string(&v).unwrap(), "17");
    let back: Version = serde_json::from_str("17").unwrap();
    assert_eq!(back, v);
}

proptest! {
    #[test]
    fn advance_then_rewind_is_identity(start in 0u64..1_000_000, steps in 0usize..10_000) {
        let v = Version::new(start);
        prop_assert_eq!(v.advance(steps).rewind(steps).unwrap(), v);
    }

    #[test]
    fn advance_is_monotonic(start in 0u64..1_000_000, steps in 1usize..10_000) {
        let v = Version::new(start);
        prop_assert!(v.advance(steps) > v);
    }
}
