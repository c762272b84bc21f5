use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use snifflens_core::{DecodedPacket, MemoryStore, RawPacket};
use snifflens_handlers::build_decoder;

fn fixture_dir(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..")
        .join("tests")
        .join("golden")
        .join(name)
}

fn load_expected(name: &str) -> DecodedPacket {
    let expected_path = fixture_dir(name).join("expected.json");
    let expected_json = fs::read_to_string(&expected_path).expect("read expected.json");
    serde_json::from_str(&expected_json).expect("parse expected packet")
}

fn run_golden(name: &str) {
    let input_json =
        fs::read_to_string(fixture_dir(name).join("input.json")).expect("read input.json");
    let packet: RawPacket = serde_json::from_str(&input_json).expect("parse input packet");
    let expected = load_expected(name);

    let decoder = build_decoder(Arc::new(MemoryStore::new())).expect("catalogue freezes");
    let actual = decoder.decode(packet);

    let actual_value = serde_json::to_value(actual).expect("serialize actual");
    let expected_value = serde_json::to_value(expected).expect("serialize expected");

    assert_eq!(actual_value, expected_value, "golden mismatch in {name}");
}

#[test]
fn golden_minimap_ping() {
    run_golden("minimap_ping");
}

#[test]
fn golden_ready_check_trailing() {
    run_golden("ready_check_trailing");
}

#[test]
fn golden_db_reply_unknown_table() {
    run_golden("db_reply_unknown_table");
}

#[test]
fn golden_ready_check_trailing_names_the_junk_span() {
    let expected = load_expected("ready_check_trailing");
    assert_eq!(expected.trailing_bytes, 2);
    assert!(expected.diagnostic.unwrap().ends_with("aa bb"));
}

#[test]
fn golden_db_reply_unknown_table_scans_word_cells() {
    let expected = load_expected("db_reply_unknown_table");
    let cells = expected
        .fields
        .iter()
        .filter(|record| record.name == "BlockValue")
        .count();
    assert_eq!(cells, 2);
}
