//! Rule engine integration tests.
//!
//! Parses rule tables the way they appear in configuration and checks the
//! resolved encode parameters through the public API.

use shelfwatch::rules::{parse_rule_table, resolve_action, EncodeParams, MediaDescriptor};

fn params(codec: &str, bit_rate: &str, channels: &str) -> EncodeParams {
    EncodeParams {
        codec: codec.into(),
        bit_rate: bit_rate.into(),
        channels: channels.into(),
    }
}

// ---------------------------------------------------------------------------
// Tiered speech/music table
// ---------------------------------------------------------------------------

const TIERED: &str = "0|1|48000|1|1=opus|24000|1,0|0|0|0|0=opus|64000|2";

#[test]
fn low_bitrate_mono_is_downmixed_to_speech_tier() {
    let table = parse_rule_table(TIERED);
    assert_eq!(
        resolve_action(&table, &MediaDescriptor::new("mp3", 32_000, 1)),
        Some(params("opus", "24000", "1"))
    );
}

#[test]
fn everything_else_gets_the_fallback() {
    let table = parse_rule_table(TIERED);
    for info in [
        MediaDescriptor::new("mp3", 320_000, 2),
        MediaDescriptor::new("mp3", 32_000, 2),
        MediaDescriptor::new("flac", 48_001, 1),
    ] {
        assert_eq!(
            resolve_action(&table, &info),
            Some(params("opus", "64000", "2")),
            "{info:?}"
        );
    }
}

// ---------------------------------------------------------------------------
// Table shapes
// ---------------------------------------------------------------------------

#[test]
fn bare_copy_keeps_source_parameters() {
    let table = parse_rule_table("copy");
    assert_eq!(table.len(), 1);
    assert_eq!(
        resolve_action(&table, &MediaDescriptor::new("AAC", 128_000, 6)),
        Some(params("aac", "128000", "6"))
    );
}

#[test]
fn later_fallback_replaces_earlier_one() {
    let table = parse_rule_table("aac|64000|2,mp3|0|0|0|2=copy,opus|32000|1");
    assert_eq!(
        resolve_action(&table, &MediaDescriptor::new("flac", 900_000, 2)),
        Some(params("opus", "32000", "1"))
    );
    assert_eq!(
        resolve_action(&table, &MediaDescriptor::new("mp3", 96_000, 2)),
        Some(params("mp3", "96000", "2"))
    );
}

#[test]
fn table_without_fallback_leaves_unmatched_items_alone() {
    let table = parse_rule_table("flac|0|0|0|0=aac|256000|2");
    assert_eq!(
        resolve_action(&table, &MediaDescriptor::new("mp3", 128_000, 2)),
        None
    );
}

#[test]
fn malformed_items_are_skipped() {
    let table = parse_rule_table("mp3|x|0|0|0=aac|1|1, ,mp3|0|0=aac|1|1,flac|0|0|0|0=aac|192000|2");
    assert_eq!(table.len(), 1);
    assert!(resolve_action(&table, &MediaDescriptor::new("flac", 1, 2)).is_some());
}

#[test]
fn empty_table_resolves_nothing() {
    let table = parse_rule_table("");
    assert!(table.is_empty());
    assert_eq!(
        resolve_action(&table, &MediaDescriptor::new("mp3", 128_000, 2)),
        None
    );
}
