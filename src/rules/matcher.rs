use super::{Bounds, Condition, ConversionRule, EncodeParams, MediaDescriptor, RuleTable};

/// Check if a descriptor satisfies a rule's condition.
pub fn matches_condition(info: &MediaDescriptor, condition: &Condition) -> bool {
    matches_codec(info, condition.codec.as_deref())
        && matches_bounds(info.bit_rate, &condition.bit_rate)
        && matches_bounds(u64::from(info.channels), &condition.channels)
}

/// Find the first declared rule whose condition holds. The fallback is not
/// considered here.
pub fn find_matching_rule<'a>(
    table: &'a RuleTable,
    info: &MediaDescriptor,
) -> Option<&'a ConversionRule> {
    table
        .rules()
        .iter()
        .find(|rule| matches_condition(info, &rule.condition))
}

/// Resolve the encode parameters for a descriptor.
///
/// First match wins; the fallback applies only when no declared rule matches.
/// A copy action resolves to the descriptor's own parameters.
pub fn resolve_action(table: &RuleTable, info: &MediaDescriptor) -> Option<EncodeParams> {
    find_matching_rule(table, info)
        .map(|rule| &rule.action)
        .or_else(|| table.fallback())
        .map(|action| action.resolve(info))
}

fn matches_codec(info: &MediaDescriptor, codec: Option<&str>) -> bool {
    match codec {
        None => true,
        Some(codec) => info.codec.eq_ignore_ascii_case(codec),
    }
}

fn matches_bounds(value: u64, bounds: &Bounds) -> bool {
    bounds.contains(value)
}
