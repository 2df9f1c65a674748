//! # Topics
//!
//! `/`-separated topic names and subscription filters.
//!
//! Filters support two wildcards, matched per level:
//! - `+` matches exactly one level
//! - `#` matches the remaining levels (zero or more); only valid last

use crate::error::BusError;

/// Topic level separator.
pub const TOPIC_SEPARATOR: char = '/';

/// Single-level wildcard.
pub const SINGLE_LEVEL_WILDCARD: &str = "+";

/// Multi-level wildcard.
pub const MULTI_LEVEL_WILDCARD: &str = "#";

/// Join topic levels with `/`.
#[must_use]
pub fn build_topic(levels: &[&str]) -> String {
    levels.join("/")
}

/// Check that `topic` can be published to.
pub fn validate_publish_topic(topic: &str) -> Result<(), BusError> {
    if topic.is_empty() {
        return Err(BusError::InvalidTopic {
            topic: topic.to_string(),
            reason: "topic is empty".to_string(),
        });
    }
    if topic
        .split(TOPIC_SEPARATOR)
        .any(|level| level == SINGLE_LEVEL_WILDCARD || level == MULTI_LEVEL_WILDCARD)
    {
        return Err(BusError::InvalidTopic {
            topic: topic.to_string(),
            reason: "wildcards are only allowed in subscriptions".to_string(),
        });
    }
    Ok(())
}

/// Check that `filter` is a well-formed subscription filter.
pub fn validate_filter(filter: &str) -> Result<(), BusError> {
    if filter.is_empty() {
        return Err(BusError::InvalidTopic {
            topic: filter.to_string(),
            reason: "filter is empty".to_string(),
        });
    }
    let levels: Vec<&str> = filter.split(TOPIC_SEPARATOR).collect();
    let last = levels.len() - 1;
    for (index, level) in levels.iter().enumerate() {
        if *level == MULTI_LEVEL_WILDCARD && index != last {
            return Err(BusError::InvalidTopic {
                topic: filter.to_string(),
                reason: "'#' must be the last level".to_string(),
            });
        }
    }
    Ok(())
}

/// True if `topic` matches the subscription `filter`.
#[must_use]
pub fn topic_matches(filter: &str, topic: &str) -> bool {
    let mut filter_levels = filter.split(TOPIC_SEPARATOR);
    let mut topic_levels = topic.split(TOPIC_SEPARATOR);

    loop {
        match (filter_levels.next(), topic_levels.next()) {
            (Some(MULTI_LEVEL_WILDCARD), _) => return true,
            (Some(SINGLE_LEVEL_WILDCARD), Some(_)) => {}
            (Some(expected), Some(actual)) if expected == actual => {}
            (None, None) => return true,
            _ => return false,
        }
    }
}
