use reference::{normalize_sequence, ReferenceTable};
use shared::{domain::AllocationRow, error::ApiError, protocol::CascadeOptions};

pub const UNKNOWN_TRIPLE: &str =
    "Combinação de órgão, dotação e sequencial não encontrada na tabela de referência.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CascadeStep {
    Organization,
    Allocation,
    Sequence,
}

impl CascadeStep {
    pub fn label(self) -> &'static str {
        match self {
            Self::Organization => "o Órgão",
            Self::Allocation => "a Dotação",
            Self::Sequence => "o Sequencial",
        }
    }
}

/// The three chained choices. `None` means the step has not been chosen.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    pub organization: Option<String>,
    pub allocation: Option<String>,
    pub sequence: Option<String>,
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

impl Selection {
    /// Sequences are stored in reference form, so `12.0` and `12` name the same choice.
    pub fn from_inputs(organization: &str, allocation: &str, sequence: &str) -> Self {
        Self {
            organization: non_empty(organization),
            allocation: non_empty(allocation),
            sequence: non_empty(&normalize_sequence(sequence)),
        }
    }

    /// Keeps the longest prefix of choices that the reference table still offers.
    pub fn normalized(self, reference: &ReferenceTable) -> Self {
        let Some(organization) = self
            .organization
            .filter(|org| reference.has_organization(org))
        else {
            return Self::default();
        };
        let Some(allocation) = self
            .allocation
            .filter(|code| reference.allocations(&organization).contains(code))
        else {
            return Self {
                organization: Some(organization),
                ..Self::default()
            };
        };
        let sequence = self
            .sequence
            .filter(|seq| reference.sequences(&organization, &allocation).contains(seq));

        Self {
            organization: Some(organization),
            allocation: Some(allocation),
            sequence,
        }
    }

    /// First step still waiting for a choice, in cascade order.
    pub fn pending_step(&self) -> Option<CascadeStep> {
        if self.organization.is_none() {
            Some(CascadeStep::Organization)
        } else if self.allocation.is_none() {
            Some(CascadeStep::Allocation)
        } else if self.sequence.is_none() {
            Some(CascadeStep::Sequence)
        } else {
            None
        }
    }
}

/// Options for every step; a step whose parent is unselected offers nothing.
pub fn cascade_options(reference: &ReferenceTable, selection: &Selection) -> CascadeOptions {
    let organizations = reference.organizations();
    let allocations = selection
        .organization
        .as_deref()
        .map(|org| reference.allocations(org))
        .unwrap_or_default();
    let sequences = match (
        selection.organization.as_deref(),
        selection.allocation.as_deref(),
    ) {
        (Some(org), Some(code)) => reference.sequences(org, code),
        _ => Vec::new(),
    };

    CascadeOptions {
        organizations,
        allocations,
        sequences,
    }
}

/// The reference row named by a complete selection.
pub fn resolve(reference: &ReferenceTable, selection: &Selection) -> Result<AllocationRow, ApiError> {
    if let Some(step) = selection.pending_step() {
        return Err(ApiError::validation(format!(
            "Por favor, selecione {}.",
            step.label()
        )));
    }
    let (Some(org), Some(code), Some(seq)) = (
        selection.organization.as_deref(),
        selection.allocation.as_deref(),
        selection.sequence.as_deref(),
    ) else {
        return Err(ApiError::validation(UNKNOWN_TRIPLE));
    };

    reference
        .find(org, code, seq)
        .cloned()
        .ok_or_else(|| ApiError::validation(UNKNOWN_TRIPLE))
}

#[cfg(test)]
#[path = "tests/selector_tests.rs"]
mod tests;
