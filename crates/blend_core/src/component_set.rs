use serde::{Deserialize, Serialize};

use crate::{Component, EditError, RatioEdit, RatioError, DEFAULT_RATIO};

/// Parses a ratio typed as text.
///
/// The whole trimmed string must be a finite, non-negative number. `-0` is
/// normalized to `0`.
pub fn parse_ratio(text: &str) -> Result<f64, RatioError> {
    let value: f64 = text.trim().parse().map_err(|_| RatioError::Unparsable)?;
    check_ratio(value)
}

fn check_ratio(value: f64) -> Result<f64, RatioError> {
    if !value.is_finite() {
        return Err(RatioError::NonFinite);
    }
    if value < 0.0 {
        return Err(RatioError::Negative);
    }
    Ok(if value == 0.0 { 0.0 } else { value })
}

/// Ordered list of blend components. Order drives display and basis indexing.
///
/// Serializes as a plain array. Deserializing validates every ratio the way
/// [`ComponentSet::from_pairs`] does.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Component>", into = "Vec<Component>")]
pub struct ComponentSet {
    components: Vec<Component>,
}

impl ComponentSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a set from `(name, ratio)` pairs, rejecting the first invalid ratio.
    pub fn from_pairs<I, S>(pairs: I) -> Result<Self, RatioError>
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        let mut set = Self::new();
        for (name, ratio) in pairs {
            set.push(name, ratio)?;
        }
        Ok(set)
    }

    /// Appends a component with an explicit ratio. Returns its index.
    pub fn push(&mut self, name: impl Into<String>, ratio: f64) -> Result<usize, RatioError> {
        let ratio = check_ratio(ratio)?;
        self.components.push(Component::new(name, ratio));
        Ok(self.components.len() - 1)
    }

    /// Appends `Component {n}` (n = new length) with the default ratio.
    ///
    /// The generated name may collide with an existing one.
    pub fn add(&mut self) -> usize {
        let name = format!("Component {}", self.components.len() + 1);
        self.components.push(Component::new(name, DEFAULT_RATIO));
        self.components.len() - 1
    }

    /// Removes and returns the component at `index`; `None` when out of bounds.
    pub fn remove(&mut self, index: usize) -> Option<Component> {
        (index < self.components.len()).then(|| self.components.remove(index))
    }

    pub fn set_name(&mut self, index: usize, name: impl Into<String>) -> Result<(), EditError> {
        let component = self.get_mut(index)?;
        component.name = name.into();
        Ok(())
    }

    /// Permissive text edit: anything that is not a finite, non-negative
    /// number stores a zero ratio and reports why.
    pub fn set_ratio(&mut self, index: usize, text: &str) -> Result<RatioEdit, EditError> {
        let component = self.get_mut(index)?;
        let edit = match parse_ratio(text) {
            Ok(ratio) => RatioEdit::Applied { ratio },
            Err(reason) => RatioEdit::CoercedToZero { reason },
        };
        component.ratio = edit.ratio();
        Ok(edit)
    }

    /// Strict numeric edit. Invalid values leave the component untouched.
    pub fn set_ratio_value(&mut self, index: usize, ratio: f64) -> Result<(), EditError> {
        let ratio = check_ratio(ratio)?;
        self.get_mut(index)?.ratio = ratio;
        Ok(())
    }

    /// Sum of all ratios; zero for an empty set.
    pub fn total_ratio(&self) -> f64 {
        self.components.iter().map(|c| c.ratio).sum()
    }

    pub fn get(&self, index: usize) -> Option<&Component> {
        self.components.get(index)
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Component> {
        self.components.iter()
    }

    pub fn as_slice(&self) -> &[Component] {
        &self.components
    }

    pub fn clear(&mut self) {
        self.components.clear();
    }

    fn get_mut(&mut self, index: usize) -> Result<&mut Component, EditError> {
        let len = self.components.len();
        self.components
            .get_mut(index)
            .ok_or(EditError::IndexOutOfRange { index, len })
    }
}

impl TryFrom<Vec<Component>> for ComponentSet {
    type Error = RatioError;

    fn try_from(components: Vec<Component>) -> Result<Self, Self::Error> {
        Self::from_pairs(components.into_iter().map(|c| (c.name, c.ratio)))
    }
}

impl From<ComponentSet> for Vec<Component> {
    fn from(set: ComponentSet) -> Self {
        set.components
    }
}

/// Collects components as-is, without the ratio checks `from_pairs` and
/// deserialization apply. The solver still refuses negative ratios.
impl FromIterator<Component> for ComponentSet {
    fn from_iter<I: IntoIterator<Item = Component>>(iter: I) -> Self {
        Self {
            components: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a ComponentSet {
    type Item = &'a Component;
    type IntoIter = std::slice::Iter<'a, Component>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
