//! Action triggers: ordered regular expressions matched against message text.
//!
//! The first trigger that matches wins and its first capture group names the
//! action to dispatch; later triggers are never evaluated for that message.

use regex::Regex;

/// Why a trigger list failed to compile.
#[derive(Debug, thiserror::Error)]
pub enum TriggerError {
    #[error("invalid trigger pattern {pattern:?}: {source}")]
    Invalid {
        pattern: String,
        source: regex::Error,
    },
}

/// A successful match: which trigger fired and the captured action name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerMatch {
    pub index: usize,
    pub action: String,
}

/// Ordered, compiled trigger patterns.
#[derive(Debug)]
pub struct TriggerSet {
    triggers: Vec<Regex>,
}

impl TriggerSet {
    /// Compile patterns in configured order. A pattern without a capture group
    /// is accepted (it matches with an empty action name) but logged, since an
    /// empty action name can only ever fail the host's action lookup.
    pub fn compile(patterns: &[String]) -> Result<Self, TriggerError> {
        let mut triggers = Vec::with_capacity(patterns.len());
        for pattern in patterns {
            let re = Regex::new(pattern).map_err(|source| TriggerError::Invalid {
                pattern: pattern.clone(),
                source,
            })?;
            if re.captures_len() < 2 {
                log::warn!(
                    "trigger pattern {:?} has no capture group; matches will dispatch an empty action name",
                    pattern
                );
            }
            triggers.push(re);
        }
        Ok(Self { triggers })
    }

    pub fn len(&self) -> usize {
        self.triggers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triggers.is_empty()
    }

    /// Match `text` against the triggers in order; the first hit wins and
    /// evaluation stops. A capture group that is empty or did not participate
    /// yields an empty action name. `None` means no trigger matched — a normal
    /// outcome, not an error.
    pub fn first_match(&self, text: &str) -> Option<TriggerMatch> {
        for (index, re) in self.triggers.iter().enumerate() {
            if let Some(caps) = re.captures(text) {
                let action = caps.get(1).map(|m| m.as_str()).unwrap_or("").to_string();
                return Some(TriggerMatch { index, action });
            }
        }
        None
    }
}
