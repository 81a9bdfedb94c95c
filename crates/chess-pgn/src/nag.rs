//! Numeric Annotation Glyphs.

use std::fmt;

/// A Numeric Annotation Glyph (`$n`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Nag(pub u8);

/// Classes of NAGs. A node carries at most one NAG of each exclusive class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NagClass {
    /// `$1`..`$9`
    MoveAssessment,
    /// `$10`..`$21`
    PositionAssessment,
    /// Everything else, unique by value only.
    Other,
}

impl Nag {
    pub const GOOD_MOVE: Nag = Nag(1);
    pub const MISTAKE: Nag = Nag(2);
    pub const BRILLIANT_MOVE: Nag = Nag(3);
    pub const BLUNDER: Nag = Nag(4);
    pub const SPECULATIVE_MOVE: Nag = Nag(5);
    pub const DUBIOUS_MOVE: Nag = Nag(6);
    pub const NOVELTY: Nag = Nag(146);
    pub const DIAGRAM: Nag = Nag(220);

    pub fn class(self) -> NagClass {
        match self.0 {
            1..=9 => NagClass::MoveAssessment,
            10..=21 => NagClass::PositionAssessment,
            _ => NagClass::Other,
        }
    }

    /// Maps a textual glyph such as `!?` or `+/-` to its code.
    pub fn from_glyph(glyph: &str) -> Option<Nag> {
        GLYPHS
            .iter()
            .find(|(_, g)| *g == glyph)
            .map(|(code, _)| Nag(*code))
    }

    /// Canonical glyph for this code, if it has one.
    pub fn glyph(self) -> Option<&'static str> {
        GLYPHS
            .iter()
            .find(|(code, _)| *code == self.0)
            .map(|(_, g)| *g)
    }

    pub fn description(self) -> Option<&'static str> {
        DESCRIPTIONS.get(usize::from(self.0)).copied()
    }

    /// Parses either `$n` or a textual glyph.
    pub fn parse(text: &str) -> Option<Nag> {
        match text.strip_prefix('$') {
            Some(digits) => digits.parse().ok().map(Nag),
            None => Nag::from_glyph(text),
        }
    }
}

impl fmt::Display for Nag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${}", self.0)
    }
}

const GLYPHS: &[(u8, &str)] = &[
    (1, "!"),
    (2, "?"),
    (3, "!!"),
    (4, "??"),
    (5, "!?"),
    (6, "?!"),
    (10, "="),
    (13, "~"),
    (14, "+="),
    (15, "=+"),
    (16, "+/-"),
    (17, "-/+"),
    (18, "+-"),
    (19, "-+"),
    (20, "+--"),
    (21, "--+"),
    (146, "N"),
    (220, "D"),
];

const DESCRIPTIONS: [&str; 22] = [
    "null annotation",
    "good move",
    "poor move",
    "very good move",
    "very poor move",
    "speculative move",
    "questionable move",
    "forced move",
    "singular move",
    "worst move",
    "drawish position",
    "equal chances, quiet position",
    "equal chances, active position",
    "unclear position",
    "White has a slight advantage",
    "Black has a slight advantage",
    "White has a moderate advantage",
    "Black has a moderate advantage",
    "White has a decisive advantage",
    "Black has a decisive advantage",
    "White has a crushing advantage",
    "Black has a crushing advantage",
];

/// Ordered set of NAGs attached to one node.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NagSet {
    nags: Vec<Nag>,
}

impl NagSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a NAG. A NAG of an exclusive class replaces the existing member
    /// of that class in place; other NAGs are ignored when already present.
    pub fn push(&mut self, nag: Nag) {
        let class = nag.class();
        if class != NagClass::Other {
            if let Some(slot) = self.nags.iter_mut().find(|n| n.class() == class) {
                *slot = nag;
                return;
            }
        }
        if !self.nags.contains(&nag) {
            self.nags.push(nag);
        }
    }

    pub fn remove_class(&mut self, class: NagClass) {
        self.nags.retain(|n| n.class() != class);
    }

    pub fn get(&self, class: NagClass) -> Option<Nag> {
        self.nags.iter().copied().find(|n| n.class() == class)
    }

    pub fn contains(&self, nag: Nag) -> bool {
        self.nags.contains(&nag)
    }

    pub fn iter(&self) -> impl Iterator<Item = Nag> + '_ {
        self.nags.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.nags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nags.is_empty()
    }

    pub fn clear(&mut self) {
        self.nags.clear();
    }
}

impl FromIterator<Nag> for NagSet {
    fn from_iter<I: IntoIterator<Item = Nag>>(iter: I) -> Self {
        let mut set = NagSet::new();
        for nag in iter {
            set.push(nag);
        }
        set
    }
}
