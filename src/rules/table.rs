use super::{
    Action, Bounds, Condition, ConversionRule, RuleTable, TargetCodec, COPY_SENTINEL, WILDCARD,
};

const ITEM_SEPARATOR: char = ',';
const ACTION_SEPARATOR: char = '=';
const FIELD_SEPARATOR: char = '|';

/// Parse a textual rule table.
///
/// Items are separated by `,`; each item is `codec|brLow|brHigh|chLow|chHigh=codec|bitrate|channels`.
/// An item without `=` is a bare fallback action. A condition with every field
/// wildcarded is also the fallback. Items that fail to parse are skipped.
pub fn parse_rule_table(text: &str) -> RuleTable {
    let mut rules = Vec::new();
    let mut fallback = None;

    for item in text.split(ITEM_SEPARATOR) {
        let item = item.trim();
        if item.is_empty() {
            continue;
        }

        match item.split_once(ACTION_SEPARATOR) {
            Some((condition, action)) => {
                let (Some(condition), Some(action)) =
                    (parse_condition(condition), parse_action(action))
                else {
                    tracing::debug!(item, "Skipping malformed conversion rule");
                    continue;
                };

                if condition.is_wildcard() {
                    fallback = Some(action);
                } else {
                    rules.push(ConversionRule { condition, action });
                }
            }
            None => match parse_action(item) {
                Some(action) => fallback = Some(action),
                None => tracing::debug!(item, "Skipping malformed fallback rule"),
            },
        }
    }

    RuleTable::new(rules, fallback)
}

fn fields(text: &str) -> Vec<&str> {
    text.split(FIELD_SEPARATOR).map(str::trim).collect()
}

fn parse_condition(text: &str) -> Option<Condition> {
    let parts = fields(text);
    let [codec, br_low, br_high, ch_low, ch_high] = parts[..] else {
        return None;
    };

    let codec = match codec {
        "" => return None,
        WILDCARD => None,
        name => Some(name.to_lowercase()),
    };

    Some(Condition {
        codec,
        bit_rate: Bounds::new(br_low.parse().ok()?, br_high.parse().ok()?),
        channels: Bounds::new(ch_low.parse().ok()?, ch_high.parse().ok()?),
    })
}

fn parse_action(text: &str) -> Option<Action> {
    let parts = fields(text);

    match parts[..] {
        [codec] if codec.eq_ignore_ascii_case(COPY_SENTINEL) => Some(Action {
            codec: TargetCodec::Copy,
            bit_rate: String::new(),
            channels: String::new(),
        }),
        [codec, bit_rate, channels] if !codec.is_empty() => {
            let codec = if codec.eq_ignore_ascii_case(COPY_SENTINEL) {
                TargetCodec::Copy
            } else {
                TargetCodec::Named(codec.to_string())
            };
            Some(Action {
                codec,
                bit_rate: bit_rate.to_string(),
                channels: channels.to_string(),
            })
        }
        _ => None,
    }
}
