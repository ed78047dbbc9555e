//! Conversion rule engine.
//!
//! A rule table is an ordered list of `condition=action` items parsed once at
//! startup. Matching is first-match-wins over the declared rules, then the
//! optional fallback.

mod matcher;
mod table;

#[cfg(test)]
mod test_fixtures;

pub use matcher::*;
pub use table::parse_rule_table;

use std::fmt;

/// Codec token in an action meaning "keep the source parameters".
pub const COPY_SENTINEL: &str = "copy";

/// Token in a condition field meaning "any value".
pub const WILDCARD: &str = "0";

/// Source parameters of one item, sampled for a single dispatch attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaDescriptor {
    /// Lower-cased codec name.
    pub codec: String,
    pub bit_rate: u64,
    pub channels: u32,
}

impl MediaDescriptor {
    pub fn new(codec: &str, bit_rate: u64, channels: u32) -> Self {
        Self {
            codec: codec.to_lowercase(),
            bit_rate,
            channels,
        }
    }
}

/// Inclusive range where `0` on either side leaves that side unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Bounds {
    pub low: u64,
    pub high: u64,
}

impl Bounds {
    pub fn new(low: u64, high: u64) -> Self {
        Self { low, high }
    }

    pub fn contains(&self, value: u64) -> bool {
        (self.low == 0 || value >= self.low) && (self.high == 0 || value <= self.high)
    }

    pub fn is_unbounded(&self) -> bool {
        self.low == 0 && self.high == 0
    }
}

/// Left-hand side of a rule.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Condition {
    /// `None` matches any codec. Stored lower-cased.
    pub codec: Option<String>,
    pub bit_rate: Bounds,
    pub channels: Bounds,
}

impl Condition {
    pub fn is_wildcard(&self) -> bool {
        self.codec.is_none() && self.bit_rate.is_unbounded() && self.channels.is_unbounded()
    }
}

/// Target codec of an action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetCodec {
    /// Re-encode with the source's own parameters.
    Copy,
    Named(String),
}

/// Right-hand side of a rule, as written in the table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Action {
    pub codec: TargetCodec,
    pub bit_rate: String,
    pub channels: String,
}

impl Action {
    /// Resolve the copy sentinel against the source descriptor.
    pub fn resolve(&self, source: &MediaDescriptor) -> EncodeParams {
        match &self.codec {
            TargetCodec::Copy => EncodeParams {
                codec: source.codec.clone(),
                bit_rate: source.bit_rate.to_string(),
                channels: source.channels.to_string(),
            },
            TargetCodec::Named(codec) => EncodeParams {
                codec: codec.clone(),
                bit_rate: self.bit_rate.clone(),
                channels: self.channels.clone(),
            },
        }
    }
}

/// Concrete parameters sent with an encode request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodeParams {
    pub codec: String,
    pub bit_rate: String,
    pub channels: String,
}

impl fmt::Display for EncodeParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} @ {} bps, {} ch", self.codec, self.bit_rate, self.channels)
    }
}

/// One `condition=action` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionRule {
    pub condition: Condition,
    pub action: Action,
}

/// Parsed rule table. Immutable after parsing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleTable {
    rules: Vec<ConversionRule>,
    fallback: Option<Action>,
}

impl RuleTable {
    pub fn new(rules: Vec<ConversionRule>, fallback: Option<Action>) -> Self {
        Self { rules, fallback }
    }

    /// Declared rules in order, excluding the fallback.
    pub fn rules(&self) -> &[ConversionRule] {
        &self.rules
    }

    pub fn fallback(&self) -> Option<&Action> {
        self.fallback.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty() && self.fallback.is_none()
    }

    pub fn len(&self) -> usize {
        self.rules.len() + usize::from(self.fallback.is_some())
    }
}
