use serde::{Deserialize, Serialize};

/// The statement role of a query part.
///
/// Every part carries exactly one tag. The tag decides where a part may be
/// inserted relative to others and how the compiler renders it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperationType {
    /// Untagged fragment (brackets, operators, closing parts)
    None,

    // Select
    Select,
    /// Field reference inside a select list
    Include,
    From,
    Join,
    LeftJoin,
    RightJoin,
    FullJoin,
    Where,
    And,
    Or,
    OrderBy,
    OrderByDesc,
    ThenBy,
    ThenByDesc,
    GroupBy,
    Having,

    // Insert / update / delete
    Insert,
    InsertFields,
    Values,
    Update,
    Set,
    Delete,

    // Table definition
    CreateTable,
    Column,
    IgnoreColumn,
    TableKeys,
    AlterTable,
    AlterField,
    AddColumn,
    DropColumn,
    RenameTable,
    DropTable,

    // Procedures
    Parameter,
    OutParameterPrefix,
    OutParameterSuffix,
}

impl OperationType {
    pub fn is_join(&self) -> bool {
        matches!(
            self,
            OperationType::Join
                | OperationType::LeftJoin
                | OperationType::RightJoin
                | OperationType::FullJoin
        )
    }

    /// Tags that own a table in the FROM/JOIN chain.
    pub fn is_entity_source(&self) -> bool {
        *self == OperationType::From || self.is_join()
    }

    pub fn is_order(&self) -> bool {
        matches!(
            self,
            OperationType::OrderBy
                | OperationType::OrderByDesc
                | OperationType::ThenBy
                | OperationType::ThenByDesc
        )
    }

    /// Tags taking part in create-table trailing comma detection.
    pub fn is_table_member(&self) -> bool {
        matches!(self, OperationType::Column | OperationType::TableKeys)
    }
}

impl std::fmt::Display for OperationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Operation requested on a single table column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FieldOperation {
    /// Plain column in a CREATE TABLE
    #[default]
    None,
    Add,
    Alter,
    Drop,
}

impl std::fmt::Display for FieldOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldOperation::None => write!(f, "COLUMN"),
            FieldOperation::Add => write!(f, "ADD COLUMN"),
            FieldOperation::Alter => write!(f, "ALTER COLUMN"),
            FieldOperation::Drop => write!(f, "DROP COLUMN"),
        }
    }
}
