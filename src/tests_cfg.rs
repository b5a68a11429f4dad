//! Mapped entities shared by unit tests.

use chrono::NaiveDateTime;

use crate::schema::{Entity, Member};
use crate::value::{SqlType, Value};

#[derive(Debug, Clone)]
pub struct Customer {
    pub id: i64,
    pub name: String,
    pub email: Option<String>,
}

impl Entity for Customer {
    fn entity_name() -> &'static str {
        "Customer"
    }

    fn members() -> Vec<Member> {
        vec![
            Member::new("Id", SqlType::Int),
            Member::new("Name", SqlType::String).nullable(),
            Member::new("Email", SqlType::String).nullable(),
        ]
    }

    fn values(&self) -> Vec<Value> {
        vec![
            self.id.into(),
            self.name.clone().into(),
            self.email.clone().into(),
        ]
    }
}

#[derive(Debug, Clone)]
pub struct Orders {
    pub orders_id: i64,
    pub customer_id: i64,
    pub ship_name: Option<String>,
    pub order_date: Option<NaiveDateTime>,
}

impl Entity for Orders {
    fn entity_name() -> &'static str {
        "Orders"
    }

    fn members() -> Vec<Member> {
        vec![
            Member::new("OrdersId", SqlType::Int),
            Member::new("CustomerId", SqlType::Int),
            Member::new("ShipName", SqlType::String).nullable(),
            Member::new("OrderDate", SqlType::DateTime).nullable(),
        ]
    }

    fn values(&self) -> Vec<Value> {
        vec![
            self.orders_id.into(),
            self.customer_id.into(),
            self.ship_name.clone().into(),
            self.order_date.into(),
        ]
    }
}

/// Projection of a customer with its latest order.
#[derive(Debug, Clone)]
pub struct CustomerOrder {
    pub name: String,
    pub ship_name: Option<String>,
}

impl Entity for CustomerOrder {
    fn entity_name() -> &'static str {
        "CustomerOrder"
    }

    fn members() -> Vec<Member> {
        vec![
            Member::new("Name", SqlType::String).nullable(),
            Member::new("ShipName", SqlType::String).nullable(),
        ]
    }

    fn values(&self) -> Vec<Value> {
        vec![self.name.clone().into(), self.ship_name.clone().into()]
    }
}

/// Entity without a conventional key member.
#[derive(Debug, Clone)]
pub struct AuditLog {
    pub message: String,
}

impl Entity for AuditLog {
    fn entity_name() -> &'static str {
        "AuditLog"
    }

    fn members() -> Vec<Member> {
        vec![Member::new("Message", SqlType::String)]
    }

    fn values(&self) -> Vec<Value> {
        vec![self.message.clone().into()]
    }
}
