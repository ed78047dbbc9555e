use super::{parse_rule_table, MediaDescriptor, RuleTable};

/// Mono speech tier below 48 kbps plus a stereo fallback.
pub const TIERED_TABLE: &str = "0|1|48000|1|1=opus|24000|1,0|0|0|0|0=opus|64000|2";

pub fn tiered_table() -> RuleTable {
    parse_rule_table(TIERED_TABLE)
}

pub fn mp3(bit_rate: u64, channels: u32) -> MediaDescriptor {
    MediaDescriptor::new("mp3", bit_rate, channels)
}
