//! Ratio-to-mass conversion.
//!
//! The target mass is matched either against one component or against the
//! blend total. Each line is rounded independently to two decimals, so under
//! `Basis::ByTotal` the sum may drift from the target by up to `0.01` grams
//! per component. No residue correction is applied.

use crate::{Basis, BlendResult, ComponentSet, MassLine, NoOp};

/// Parses a target mass typed as text. Must be a finite number above zero.
pub fn parse_target_mass(text: &str) -> Result<f64, NoOp> {
    let mass: f64 = text.trim().parse().map_err(|_| NoOp::InvalidTargetMass)?;
    if !mass.is_finite() {
        return Err(NoOp::InvalidTargetMass);
    }
    if mass <= 0.0 {
        return Err(NoOp::NonPositiveTargetMass);
    }
    Ok(mass)
}

/// Rounds grams to two decimals, half away from zero on the scaled value.
///
/// `-0.0` comes back as `0.0`.
pub fn round_mass(grams: f64) -> f64 {
    let rounded = (grams * 100.0).round() / 100.0;
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}

/// Computes the mass breakdown from a raw-text target mass.
pub fn solve(
    components: &ComponentSet,
    basis: Basis,
    target_mass: &str,
) -> Result<BlendResult, NoOp> {
    solve_mass(components, basis, parse_target_mass(target_mass)?)
}

/// Computes the mass breakdown for a numeric target mass in grams.
///
/// Output has one line per component, in input order.
pub fn solve_mass(
    components: &ComponentSet,
    basis: Basis,
    target_mass: f64,
) -> Result<BlendResult, NoOp> {
    if !target_mass.is_finite() {
        return Err(NoOp::InvalidTargetMass);
    }
    if target_mass <= 0.0 {
        return Err(NoOp::NonPositiveTargetMass);
    }
    if components.is_empty() {
        return Err(NoOp::EmptyComponentSet);
    }
    if let Some(index) = components.iter().position(|c| c.ratio < 0.0) {
        return Err(NoOp::NegativeRatio { index });
    }
    let total_ratio = components.total_ratio();
    if total_ratio <= 0.0 {
        return Err(NoOp::ZeroTotalRatio);
    }

    let basis_mass = match basis {
        Basis::ByComponent(index) => {
            let Some(component) = components.get(index) else {
                return Err(NoOp::BasisOutOfRange {
                    index,
                    len: components.len(),
                });
            };
            if component.ratio <= 0.0 {
                return Err(NoOp::ZeroBasisRatio { index });
            }
            target_mass / component.ratio
        }
        Basis::ByTotal => {
            // An overflowing total would scale every line to zero.
            if !total_ratio.is_finite() {
                return Err(NoOp::NonFiniteMass);
            }
            target_mass / total_ratio
        }
    };
    if !basis_mass.is_finite() {
        return Err(NoOp::NonFiniteMass);
    }

    let lines: BlendResult = components
        .iter()
        .map(|c| MassLine {
            name: c.name.clone(),
            mass: round_mass(c.ratio * basis_mass),
        })
        .collect();
    if lines.iter().any(|line| !line.mass.is_finite()) {
        return Err(NoOp::NonFiniteMass);
    }
    Ok(lines)
}
