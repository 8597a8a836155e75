//! One interactive blend session: the component list, basis selection,
//! target-mass text, and the last computed result.
//!
//! State changes only through [`BlendSession::apply`]. Results are never
//! recomputed implicitly; they go stale after edits until the next
//! `SessionCommand::Calculate`.

use std::io;

use serde::{Deserialize, Serialize};

use crate::{
    export_csv, solve, Basis, BasisMode, BlendResult, Component, ComponentSet, CsvExport,
    EditError, ExportFormat, SessionCommand, SessionEvent, DEFAULT_RATIO,
};

#[derive(Debug, Clone, PartialEq)]
pub struct BlendSession {
    components: ComponentSet,
    basis_mode: BasisMode,
    selected_index: usize,
    target_mass: String,
    results: BlendResult,
}

/// Serializable view of a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub components: ComponentSet,
    pub basis_mode: BasisMode,
    pub selected_index: usize,
    pub target_mass: String,
    pub total_ratio: f64,
    pub results: BlendResult,
}

impl Default for BlendSession {
    /// Two equal-weight components, component basis, empty target mass.
    fn default() -> Self {
        let components = ["Component A", "Component B"]
            .into_iter()
            .map(|name| Component::new(name, DEFAULT_RATIO))
            .collect();
        Self::with_components(components)
    }
}

impl BlendSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_components(components: ComponentSet) -> Self {
        Self {
            components,
            basis_mode: BasisMode::default(),
            selected_index: 0,
            target_mass: String::new(),
            results: Vec::new(),
        }
    }

    pub fn components(&self) -> &ComponentSet {
        &self.components
    }

    pub fn basis_mode(&self) -> BasisMode {
        self.basis_mode
    }

    pub fn selected_index(&self) -> usize {
        self.selected_index
    }

    pub fn target_mass(&self) -> &str {
        &self.target_mass
    }

    /// Last successful calculation; empty until one succeeds.
    pub fn results(&self) -> &BlendResult {
        &self.results
    }

    pub fn basis(&self) -> Basis {
        match self.basis_mode {
            BasisMode::Component => Basis::ByComponent(self.selected_index),
            BasisMode::Total => Basis::ByTotal,
        }
    }

    /// Applies one command and reports what happened.
    pub fn apply(&mut self, command: SessionCommand) -> SessionEvent {
        match command {
            SessionCommand::AddComponent => {
                let index = self.components.add();
                let name = self
                    .components
                    .get(index)
                    .map(|c| c.name.clone())
                    .unwrap_or_default();
                SessionEvent::ComponentAdded { index, name }
            }
            SessionCommand::RemoveComponent { index } => self.remove_component(index),
            SessionCommand::RenameComponent { index, name } => {
                match self.components.set_name(index, name.clone()) {
                    Ok(()) => SessionEvent::ComponentRenamed { index, name },
                    Err(error) => SessionEvent::CommandIgnored { error },
                }
            }
            SessionCommand::SetRatio { index, value } => {
                match self.components.set_ratio(index, &value) {
                    Ok(edit) => SessionEvent::RatioChanged { index, edit },
                    Err(error) => SessionEvent::CommandIgnored { error },
                }
            }
            SessionCommand::SelectBasisMode { mode } => {
                self.basis_mode = mode;
                SessionEvent::BasisModeChanged { mode }
            }
            SessionCommand::SelectBasisComponent { index } => {
                if index >= self.components.len() {
                    return SessionEvent::CommandIgnored {
                        error: EditError::IndexOutOfRange {
                            index,
                            len: self.components.len(),
                        },
                    };
                }
                self.selected_index = index;
                SessionEvent::BasisComponentSelected { index }
            }
            SessionCommand::SetTargetMass { value } => {
                self.target_mass.clone_from(&value);
                SessionEvent::TargetMassChanged { value }
            }
            SessionCommand::Calculate => self.calculate(),
        }
    }

    fn remove_component(&mut self, index: usize) -> SessionEvent {
        let len = self.components.len();
        let Some(component) = self.components.remove(index) else {
            return SessionEvent::CommandIgnored {
                error: EditError::IndexOutOfRange { index, len },
            };
        };
        // Selection is positional and only reset once its slot is gone.
        let basis_reset = self.selected_index >= self.components.len() && self.selected_index != 0;
        if basis_reset {
            self.selected_index = 0;
        }
        SessionEvent::ComponentRemoved {
            index,
            component,
            basis_reset,
        }
    }

    fn calculate(&mut self) -> SessionEvent {
        match solve(&self.components, self.basis(), &self.target_mass) {
            Ok(results) => {
                self.results.clone_from(&results);
                SessionEvent::Calculated { results }
            }
            Err(reason) => SessionEvent::CalculationSkipped { reason },
        }
    }

    /// Renders the last results. `None` when nothing has been calculated.
    pub fn export(&self, format: ExportFormat) -> io::Result<Option<CsvExport>> {
        export_csv(&self.results, format)
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            components: self.components.clone(),
            basis_mode: self.basis_mode,
            selected_index: self.selected_index,
            target_mass: self.target_mass.clone(),
            total_ratio: self.components.total_ratio(),
            results: self.results.clone(),
        }
    }
}
