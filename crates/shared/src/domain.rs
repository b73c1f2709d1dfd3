use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! uuid_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub Uuid);

        impl $name {
            pub fn new_random() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                self.0.fmt(f)
            }
        }

        impl std::str::FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s).map(Self)
            }
        }
    };
}

uuid_newtype!(SessionId);

/// Worksheet that receives the submitted rows.
pub const LEDGER_WORKSHEET: &str = "Registros";

/// Column written last; older sheets may predate it.
pub const USER_NAME_HEADER: &str = "Usuario_Nome";

pub const LEDGER_HEADERS: [&str; 6] = [
    "Data",
    "Órgão",
    "Dotação",
    "Sequencial",
    "Valor",
    USER_NAME_HEADER,
];

/// One line of the reference table: a valid (organization, allocation, sequence) triple.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AllocationRow {
    pub organization: String,
    pub allocation_code: String,
    pub sequence_number: String,
}

impl AllocationRow {
    pub fn new(
        organization: impl Into<String>,
        allocation_code: impl Into<String>,
        sequence_number: impl Into<String>,
    ) -> Self {
        Self {
            organization: organization.into(),
            allocation_code: allocation_code.into(),
            sequence_number: sequence_number.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionRecord {
    /// `DD/MM/YYYY`
    pub date: String,
    pub organization: String,
    pub allocation_code: String,
    pub sequence_number: String,
    pub formatted_value: String,
    pub user_name: String,
}

impl SubmissionRecord {
    /// Cells in [`LEDGER_HEADERS`] order.
    pub fn to_row(&self) -> [String; 6] {
        [
            self.date.clone(),
            self.organization.clone(),
            self.allocation_code.clone(),
            self.sequence_number.clone(),
            self.formatted_value.clone(),
            self.user_name.clone(),
        ]
    }
}
