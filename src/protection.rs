/// Copy protection fingerprinting from weak-bit regions
///
/// Each rule looks at the weak regions a vote produced and may claim a scheme
/// with a fixed confidence. Rules run in order and the first claim wins. The
/// built-in rules cover V-MAX!, RapidLok and CopyLock. More can be added with
/// [`ProtectionMatcher::add_rule`].

use crate::vote::VoteRegion;
use crate::image::WeakPattern;
use serde::Serialize;
use std::fmt;

/// Scheme names by id
pub const SCHEME_NAMES: [&str; 5] = ["Unknown", "V-MAX!", "RapidLok", "CopyLock", "Speedlock"];

/// V-MAX! scheme id
pub const SCHEME_VMAX: u16 = 1;
/// RapidLok scheme id
pub const SCHEME_RAPIDLOK: u16 = 2;
/// CopyLock scheme id
pub const SCHEME_COPYLOCK: u16 = 3;
/// Speedlock scheme id
pub const SCHEME_SPEEDLOCK: u16 = 4;

/// Confidence a claim must exceed to be reported
pub const MIN_MATCH_CONFIDENCE: u8 = 50;

/// Name for a scheme id
pub fn scheme_name(scheme_id: u16) -> &'static str {
    SCHEME_NAMES
        .get(scheme_id as usize)
        .copied()
        .unwrap_or(SCHEME_NAMES[0])
}

/// A rule's claim on a set of weak regions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleHit {
    /// Confidence 0-100
    pub confidence: u8,
    /// Indices of the regions that matched
    pub regions: Vec<usize>,
    /// Why the rule matched
    pub reason: String,
}

/// Scheme found on a track
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProtectionMatch {
    /// Scheme id
    pub scheme_id: u16,
    /// Scheme name
    pub name: &'static str,
    /// Confidence 0-100
    pub confidence: u8,
    /// Indices of the weak regions that matched
    pub regions: Vec<usize>,
    /// Why the rule matched
    pub reason: String,
}

impl fmt::Display for ProtectionMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}%, {})", self.name, self.confidence, self.reason)
    }
}

type RuleFn = Box<dyn Fn(&[VoteRegion]) -> Option<RuleHit> + Send + Sync>;

/// One entry of the rule table
pub struct ProtectionRule {
    /// Scheme the rule detects
    pub scheme_id: u16,
    /// Scheme name
    pub name: &'static str,
    check: RuleFn,
}

impl ProtectionRule {
    /// Create a rule from a check function
    pub fn new<F>(scheme_id: u16, name: &'static str, check: F) -> Self
    where
        F: Fn(&[VoteRegion]) -> Option<RuleHit> + Send + Sync + 'static,
    {
        Self {
            scheme_id,
            name,
            check: Box::new(check),
        }
    }
}

impl fmt::Debug for ProtectionRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProtectionRule")
            .field("scheme_id", &self.scheme_id)
            .field("name", &self.name)
            .finish()
    }
}

/// V-MAX!: three or more short random regions
fn vmax(regions: &[VoteRegion]) -> Option<RuleHit> {
    let hits: Vec<usize> = regions
        .iter()
        .enumerate()
        .filter(|(_, r)| (8..=32).contains(&r.length) && r.pattern == WeakPattern::Random)
        .map(|(i, _)| i)
        .collect();
    if hits.len() < 3 {
        return None;
    }
    Some(RuleHit {
        confidence: (60 + hits.len() * 5).min(100) as u8,
        reason: format!("{} short random weak regions", hits.len()),
        regions: hits,
    })
}

/// RapidLok: one long region read as ones about half the time
fn rapidlok(regions: &[VoteRegion]) -> Option<RuleHit> {
    let index = regions
        .iter()
        .position(|r| r.length >= 64 && (40..=60).contains(&r.bias))?;
    Some(RuleHit {
        confidence: 75,
        regions: vec![index],
        reason: format!("{} bit region with {}% bias", regions[index].length, regions[index].bias),
    })
}

/// CopyLock: weak bits in the gap near the end of the track
fn copylock(regions: &[VoteRegion]) -> Option<RuleHit> {
    let index = regions
        .iter()
        .position(|r| r.start_bit > 80_000 && r.length >= 16)?;
    Some(RuleHit {
        confidence: 70,
        regions: vec![index],
        reason: format!("weak bits at bit {}", regions[index].start_bit),
    })
}

/// Ordered rule table
#[derive(Debug)]
pub struct ProtectionMatcher {
    rules: Vec<ProtectionRule>,
}

impl ProtectionMatcher {
    /// Matcher with the built-in rules
    pub fn new() -> Self {
        Self {
            rules: vec![
                ProtectionRule::new(SCHEME_VMAX, scheme_name(SCHEME_VMAX), vmax),
                ProtectionRule::new(SCHEME_RAPIDLOK, scheme_name(SCHEME_RAPIDLOK), rapidlok),
                ProtectionRule::new(SCHEME_COPYLOCK, scheme_name(SCHEME_COPYLOCK), copylock),
            ],
        }
    }

    /// Matcher with no rules
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    /// Append a rule, checked after the existing ones
    pub fn add_rule(&mut self, rule: ProtectionRule) {
        self.rules.push(rule);
    }

    /// Rules in the order they are checked
    pub fn rules(&self) -> &[ProtectionRule] {
        &self.rules
    }

    /// First rule claiming the regions, if its confidence clears the threshold
    pub fn match_regions(&self, regions: &[VoteRegion]) -> Option<ProtectionMatch> {
        if regions.is_empty() {
            return None;
        }
        let (rule, hit) = self
            .rules
            .iter()
            .find_map(|rule| (rule.check)(regions).map(|hit| (rule, hit)))?;
        if hit.confidence <= MIN_MATCH_CONFIDENCE {
            return None;
        }
        Some(ProtectionMatch {
            scheme_id: rule.scheme_id,
            name: rule.name,
            confidence: hit.confidence,
            regions: hit.regions,
            reason: hit.reason,
        })
    }
}

impl Default for ProtectionMatcher {
    fn default() -> Self {
        Self::new()
    }
}
