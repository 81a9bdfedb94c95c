//! Ordered PGN tag pairs.

/// The seven tag roster in canonical order.
pub const ROSTER: [&str; 7] = ["Event", "Site", "Date", "Round", "White", "Black", "Result"];

/// Ordered mapping of tag names to values.
///
/// Names are case-sensitive. Nothing is enforced about which tags are
/// present; [`Headers::roster_value`] supplies the conventional defaults for
/// callers that want them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    tags: Vec<(String, String)>,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.tags
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Sets a tag, replacing an existing value in place.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.tags.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.tags.push((name, value)),
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        let idx = self.tags.iter().position(|(n, _)| n == name)?;
        Some(self.tags.remove(idx).1)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Value of a roster tag, or its conventional default when absent.
    pub fn roster_value(&self, name: &str) -> &str {
        self.get(name).unwrap_or(match name {
            "Date" => "????.??.??",
            "Result" => "*",
            _ => "?",
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.tags.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }
}
