//! Recipe files shared between blend_cli and blend_daemon.
//!
//! A recipe is a named component list plus an optional basis and target mass,
//! stored as JSON.

use anyhow::{bail, Context, Result};
use blend_core::{BasisMode, BlendSession, Component, ComponentSet, SessionCommand, DEFAULT_RATIO};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
    pub name: String,
    pub components: Vec<Component>,
    #[serde(default)]
    pub basis: RecipeBasis,
    /// Grams. Left unset, the session starts with an empty target.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_mass_g: Option<f64>,
}

/// `"total"` or `{"component": <index>}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecipeBasis {
    Component(usize),
    Total,
}

impl Default for RecipeBasis {
    fn default() -> Self {
        RecipeBasis::Component(0)
    }
}

/// The two-component starting point a fresh session uses.
pub fn starter_recipe() -> Recipe {
    Recipe {
        name: "blend".to_string(),
        components: vec![
            Component::new("Component A", DEFAULT_RATIO),
            Component::new("Component B", DEFAULT_RATIO),
        ],
        basis: RecipeBasis::default(),
        target_mass_g: None,
    }
}

/// Checks a recipe for authoring errors.
///
/// Catches: an empty name, negative or non-finite ratios, a basis index past
/// the component list, and a non-positive target mass.
pub fn validate_recipe(recipe: &Recipe) -> Result<()> {
    if recipe.name.trim().is_empty() {
        bail!("recipe 'name' must not be empty");
    }
    for (index, component) in recipe.components.iter().enumerate() {
        if !component.ratio.is_finite() || component.ratio < 0.0 {
            bail!(
                "recipe '{}' component {index} ('{}') has invalid ratio {}",
                recipe.name,
                component.name,
                component.ratio,
            );
        }
    }
    if let RecipeBasis::Component(index) = recipe.basis {
        if index >= recipe.components.len() && !recipe.components.is_empty() {
            bail!(
                "recipe '{}' basis component {index} is out of range ({} components)",
                recipe.name,
                recipe.components.len(),
            );
        }
    }
    if let Some(mass) = recipe.target_mass_g {
        if !mass.is_finite() || mass <= 0.0 {
            bail!("recipe '{}' target_mass_g must be > 0", recipe.name);
        }
    }
    Ok(())
}

pub fn load_recipe(path: &Path) -> Result<Recipe> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("reading recipe file: {}", path.display()))?;
    let recipe: Recipe = serde_json::from_str(&json)
        .with_context(|| format!("parsing recipe file: {}", path.display()))?;
    validate_recipe(&recipe).with_context(|| format!("validating {}", path.display()))?;
    Ok(recipe)
}

pub fn save_recipe(path: &Path, recipe: &Recipe) -> Result<()> {
    validate_recipe(recipe)?;
    let file =
        std::fs::File::create(path).with_context(|| format!("creating {}", path.display()))?;
    serde_json::to_writer_pretty(file, recipe)
        .with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

impl Recipe {
    /// Builds a session in the recipe's state. Nothing is calculated yet.
    pub fn into_session(self) -> BlendSession {
        let components: ComponentSet = self.components.into_iter().collect();
        let mut session = BlendSession::with_components(components);
        match self.basis {
            RecipeBasis::Component(index) => {
                session.apply(SessionCommand::SelectBasisComponent { index });
            }
            RecipeBasis::Total => {
                session.apply(SessionCommand::SelectBasisMode {
                    mode: BasisMode::Total,
                });
            }
        }
        if let Some(mass) = self.target_mass_g {
            session.apply(SessionCommand::SetTargetMass {
                value: mass.to_string(),
            });
        }
        session
    }

    /// Captures a session's components, basis, and (parsable) target mass.
    pub fn from_session(name: impl Into<String>, session: &BlendSession) -> Self {
        let basis = match session.basis_mode() {
            BasisMode::Component => RecipeBasis::Component(session.selected_index()),
            BasisMode::Total => RecipeBasis::Total,
        };
        Self {
            name: name.into(),
            components: session.components().iter().cloned().collect(),
            basis,
            target_mass_g: blend_core::parse_target_mass(session.target_mass()).ok(),
        }
    }
}
