//! Mapped entities shared by the integration tests.

#![allow(dead_code)]

use chrono::NaiveDateTime;
use partsmap::prelude::*;

#[derive(Debug, Clone)]
pub struct Employee {
    pub employee_id: i64,
    pub last_name: String,
    pub first_name: String,
    pub hire_date: Option<NaiveDateTime>,
}

impl Entity for Employee {
    fn entity_name() -> &'static str {
        "Employee"
    }

    fn members() -> Vec<Member> {
        vec![
            Member::new("EmployeeID", SqlType::Int),
            Member::new("LastName", SqlType::String),
            Member::new("FirstName", SqlType::String),
            Member::new("HireDate", SqlType::DateTime).nullable(),
        ]
    }

    fn values(&self) -> Vec<Value> {
        vec![
            self.employee_id.into(),
            self.last_name.clone().into(),
            self.first_name.clone().into(),
            self.hire_date.into(),
        ]
    }
}

#[derive(Debug, Clone)]
pub struct Territory {
    pub id: i64,
    pub description: String,
    pub region_id: i64,
}

impl Entity for Territory {
    fn entity_name() -> &'static str {
        "Territory"
    }

    fn members() -> Vec<Member> {
        vec![
            Member::new("Id", SqlType::Int),
            Member::new("Description", SqlType::String),
            Member::new("RegionId", SqlType::Int),
        ]
    }

    fn values(&self) -> Vec<Value> {
        vec![
            self.id.into(),
            self.description.clone().into(),
            self.region_id.into(),
        ]
    }
}

/// Result shape joining employees to territories.
#[derive(Debug, Clone)]
pub struct EmployeeTerritory {
    pub last_name: String,
    pub description: String,
}

impl Entity for EmployeeTerritory {
    fn entity_name() -> &'static str {
        "EmployeeTerritory"
    }

    fn members() -> Vec<Member> {
        vec![
            Member::new("LastName", SqlType::String),
            Member::new("Description", SqlType::String),
        ]
    }

    fn values(&self) -> Vec<Value> {
        vec![self.last_name.clone().into(), self.description.clone().into()]
    }
}

pub fn sqlite() -> QueryCompiler {
    QueryCompiler::new(Dialect::Sqlite)
}

pub fn sqlserver() -> QueryCompiler {
    QueryCompiler::new(Dialect::SqlServer)
}
