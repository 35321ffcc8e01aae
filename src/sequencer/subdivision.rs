// Subdivision patterns - How one main beat splits into sub-beats
// The table is built once and shared read-only between scheduler instances

use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, LazyLock};

use super::{MetronomeError, MetronomeResult};

/// Tolerance used when checking that a pattern's ratios sum to 1
pub const RATIO_SUM_TOLERANCE: f64 = 1e-9;

/// Rhythmic subdivision of a main beat
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SubdivisionType {
    #[default]
    Quarter,
    Eighth,
    Triplet,
    Sixteenth,
    /// Dotted eighth + sixteenth
    Dotted31,
    /// Sixteenth + dotted eighth
    Dotted13,
    /// Eighth + two sixteenths
    Back16,
    /// Sixteenth, eighth, sixteenth
    Syncopation,
    /// Two sixteenths + eighth
    Front16,
    TripletVariant,
    TripletVariant1,
}

impl SubdivisionType {
    pub const ALL: [SubdivisionType; 11] = [
        SubdivisionType::Quarter,
        SubdivisionType::Eighth,
        SubdivisionType::Triplet,
        SubdivisionType::Sixteenth,
        SubdivisionType::Dotted31,
        SubdivisionType::Dotted13,
        SubdivisionType::Back16,
        SubdivisionType::Syncopation,
        SubdivisionType::Front16,
        SubdivisionType::TripletVariant,
        SubdivisionType::TripletVariant1,
    ];

    /// Stable name, used on disk and on the command line
    pub fn name(&self) -> &'static str {
        match self {
            SubdivisionType::Quarter => "quarter",
            SubdivisionType::Eighth => "eighth",
            SubdivisionType::Triplet => "triplet",
            SubdivisionType::Sixteenth => "sixteenth",
            SubdivisionType::Dotted31 => "dotted31",
            SubdivisionType::Dotted13 => "dotted13",
            SubdivisionType::Back16 => "back16",
            SubdivisionType::Syncopation => "syncopation",
            SubdivisionType::Front16 => "front16",
            SubdivisionType::TripletVariant => "triplet-variant",
            SubdivisionType::TripletVariant1 => "triplet-variant1",
        }
    }
}

impl fmt::Display for SubdivisionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SubdivisionType {
    type Err = MetronomeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|kind| kind.name() == trimmed)
            .ok_or_else(|| MetronomeError::UnknownSubdivision(trimmed.to_string()))
    }
}

/// Ordered time ratios of one main beat
#[derive(Debug, Clone, PartialEq)]
pub struct SubdivisionPattern {
    pub kind: SubdivisionType,
    pub ratios: Vec<f64>,
    pub description: &'static str,
}

impl SubdivisionPattern {
    /// Create a pattern, rejecting empty, non-positive or non-normalized ratios
    pub fn new(
        kind: SubdivisionType,
        ratios: Vec<f64>,
        description: &'static str,
    ) -> MetronomeResult<Self> {
        if ratios.is_empty() {
            return Err(MetronomeError::InvalidPattern(format!(
                "{kind}: pattern has no ratios"
            )));
        }
        if ratios.iter().any(|r| !r.is_finite() || *r <= 0.0) {
            return Err(MetronomeError::InvalidPattern(format!(
                "{kind}: ratios must be positive"
            )));
        }
        let sum: f64 = ratios.iter().sum();
        if (sum - 1.0).abs() > RATIO_SUM_TOLERANCE {
            return Err(MetronomeError::InvalidPattern(format!(
                "{kind}: ratios sum to {sum}, expected 1"
            )));
        }
        Ok(Self {
            kind,
            ratios,
            description,
        })
    }

    /// Number of sub-beats in one main beat
    pub fn len(&self) -> usize {
        self.ratios.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ratios.is_empty()
    }
}

static DEFAULT_TABLE: LazyLock<Arc<SubdivisionTable>> =
    LazyLock::new(|| Arc::new(SubdivisionTable::builtin()));

/// Immutable lookup from subdivision type to its pattern
#[derive(Debug, Clone, PartialEq)]
pub struct SubdivisionTable {
    patterns: Vec<SubdivisionPattern>,
}

impl SubdivisionTable {
    /// Shared handle to the built-in table
    pub fn shared() -> Arc<SubdivisionTable> {
        Arc::clone(&DEFAULT_TABLE)
    }

    /// Build a table from explicit patterns (later duplicates are rejected)
    pub fn from_patterns(patterns: Vec<SubdivisionPattern>) -> MetronomeResult<Self> {
        for (i, pattern) in patterns.iter().enumerate() {
            if patterns[..i].iter().any(|p| p.kind == pattern.kind) {
                return Err(MetronomeError::InvalidPattern(format!(
                    "{}: duplicate pattern",
                    pattern.kind
                )));
            }
        }
        Ok(Self { patterns })
    }

    fn builtin() -> Self {
        const THIRD: f64 = 1.0 / 3.0;
        const SIXTH: f64 = 1.0 / 6.0;

        let entry = |kind, ratios: &[f64], description| SubdivisionPattern {
            kind,
            ratios: ratios.to_vec(),
            description,
        };

        Self {
            patterns: vec![
                entry(SubdivisionType::Quarter, &[1.0], "Quarter notes"),
                entry(SubdivisionType::Eighth, &[0.5, 0.5], "Eighth notes"),
                entry(SubdivisionType::Triplet, &[THIRD, THIRD, THIRD], "Triplets"),
                entry(
                    SubdivisionType::Sixteenth,
                    &[0.25, 0.25, 0.25, 0.25],
                    "Sixteenth notes",
                ),
                entry(SubdivisionType::Dotted31, &[0.75, 0.25], "Dotted eighth, sixteenth"),
                entry(SubdivisionType::Dotted13, &[0.25, 0.75], "Sixteenth, dotted eighth"),
                entry(SubdivisionType::Back16, &[0.5, 0.25, 0.25], "Eighth, two sixteenths"),
                entry(SubdivisionType::Syncopation, &[0.25, 0.5, 0.25], "Syncopation"),
                entry(SubdivisionType::Front16, &[0.25, 0.25, 0.5], "Two sixteenths, eighth"),
                entry(
                    SubdivisionType::TripletVariant,
                    &[0.5, SIXTH, SIXTH, SIXTH],
                    "Eighth, sextuplet triplet",
                ),
                entry(
                    SubdivisionType::TripletVariant1,
                    &[SIXTH, SIXTH, SIXTH, 0.5],
                    "Sextuplet triplet, eighth",
                ),
            ],
        }
    }

    /// Look up the pattern for a subdivision, `None` when the table lacks it
    pub fn get(&self, kind: SubdivisionType) -> Option<&SubdivisionPattern> {
        self.patterns.iter().find(|p| p.kind == kind)
    }

    pub fn patterns(&self) -> &[SubdivisionPattern] {
        &self.patterns
    }
}

impl Default for SubdivisionTable {
    fn default() -> Self {
        Self::builtin()
    }
}
