//! Locally supported application selection.
//!
//! These tests run the registry builder against a multi-application
//! dictionary and check exact output sequences.

use diam_sm::{prepare_supported_apps, App, AppType, Dictionary, SupportedApp};
use proptest::prelude::*;

fn fixture() -> Dictionary {
    Dictionary::from_file(concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/tests/fixtures/dictionary.toml"
    ))
    .unwrap()
}

fn app(id: u32, app_type: AppType, vendor: u32) -> SupportedApp {
    SupportedApp {
        id,
        app_type,
        vendor,
    }
}

fn select(dict: &Dictionary, wanted: &[&str]) -> Vec<SupportedApp> {
    let filters: Vec<String> = wanted.iter().map(|s| s.to_string()).collect();
    prepare_supported_apps(dict, Some(filters.as_slice()))
}

/// A(1, auth), B(4, auth), C(16777251, auth, TGPP) named "S6A"
fn small() -> Dictionary {
    Dictionary::new(vec![
        App::new(0, "Base", AppType::Auth),
        App::new(1, "NASREQ", AppType::Auth),
        App::new(4, "Charging Control", AppType::Auth),
        App::new(16777251, "S6A", AppType::Auth).with_vendor(10415, "TGPP"),
    ])
}

#[test]
fn test_no_filters_selects_everything_in_order() {
    let apps = prepare_supported_apps(&fixture(), None);
    assert_eq!(
        apps,
        vec![
            app(3, AppType::Acct, 0),
            app(4, AppType::Auth, 0),
            app(1, AppType::Auth, 0),
            app(4, AppType::Auth, 10415),
            app(16777251, AppType::Auth, 10415),
            app(16777265, AppType::Auth, 10415),
        ]
    );
}

#[test]
fn test_filters_by_name_id_and_vendor() {
    let apps = select(&fixture(), &["Charging Control", "1", "TGPP.TGPP S6A"]);
    assert_eq!(
        apps,
        vec![
            app(4, AppType::Auth, 0),
            app(1, AppType::Auth, 0),
            app(16777251, AppType::Auth, 10415),
        ]
    );
}

#[test]
fn test_unknown_vendor_excludes_app() {
    let apps = select(&fixture(), &["TGPP.TGPP", "1", "NonExistentVendor.4"]);
    assert_eq!(
        apps,
        vec![app(1, AppType::Auth, 0), app(4, AppType::Auth, 10415)]
    );
}

#[test]
fn test_empty_filters_select_nothing() {
    assert!(prepare_supported_apps(&fixture(), Some(&[][..])).is_empty());
}

#[test]
fn test_small_dictionary() {
    let dict = small();

    let ids: Vec<u32> = prepare_supported_apps(&dict, None).iter().map(|a| a.id).collect();
    assert_eq!(ids, vec![1, 4, 16777251]);

    assert_eq!(
        select(&dict, &["1"]),
        vec![app(1, AppType::Auth, 0)]
    );

    let c = vec![app(16777251, AppType::Auth, 10415)];
    assert_eq!(select(&dict, &["TGPP.16777251"]), c);
    assert_eq!(select(&dict, &["TGPP.S6A"]), c);
    assert_eq!(select(&dict, &["S6A"]), c);
    assert!(select(&dict, &["Other.16777251"]).is_empty());
    // vendor is matched by name, not by id
    assert!(select(&dict, &["10415.16777251"]).is_empty());
    // a vendor requirement never matches an app without vendors
    assert!(select(&dict, &["TGPP.1"]).is_empty());
}

#[test]
fn test_duplicate_key_last_wins() {
    let dict = small();
    assert!(select(&dict, &["TGPP.S6A", "Other.S6A"]).is_empty());
    assert_eq!(
        select(&dict, &["Other.S6A", "TGPP.S6A"]).len(),
        1
    );
    assert_eq!(
        select(&dict, &["TGPP.S6A", "S6A"]).len(),
        1
    );
}

const POOL: &[&str] = &[
    "1",
    "3",
    "4",
    "Charging Control",
    "TGPP",
    "TGPP.TGPP",
    "TGPP.16777251",
    "TGPP.TGPP SWx",
    "Other.4",
    "0",
    "16777265",
    "Bogus",
];

proptest! {
    #[test]
    fn prop_selection_is_deterministic(picks in proptest::collection::vec(0..POOL.len(), 0..8)) {
        let dict = fixture();
        let wanted: Vec<String> = picks.iter().map(|i| POOL[*i].to_string()).collect();

        let first = prepare_supported_apps(&dict, Some(wanted.as_slice()));
        let second = prepare_supported_apps(&dict, Some(wanted.as_slice()));
        prop_assert_eq!(&first, &second);

        // output is a subsequence of the unfiltered list
        let all = prepare_supported_apps(&dict, None);
        let mut rest = all.iter();
        for selected in &first {
            prop_assert!(rest.any(|a| a == selected));
        }
    }

    #[test]
    fn prop_filter_order_irrelevant_without_duplicates(
        picks in proptest::sample::subsequence(POOL.to_vec(), 0..POOL.len())
    ) {
        // POOL keys are distinct per entry except vendor-qualified variants of
        // the same key, so drop those to keep keys unique.
        let mut seen = std::collections::HashSet::new();
        let wanted: Vec<String> = picks
            .iter()
            .filter(|s| seen.insert(s.rsplit('.').next().unwrap_or_default().to_string()))
            .map(|s| s.to_string())
            .collect();
        let mut reversed = wanted.clone();
        reversed.reverse();

        let dict = fixture();
        prop_assert_eq!(
            prepare_supported_apps(&dict, Some(wanted.as_slice())),
            prepare_supported_apps(&dict, Some(reversed.as_slice()))
        );
    }
}
