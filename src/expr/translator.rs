//! Turns an expression tree into query parts.

use tracing::warn;

use crate::expr::{BinaryOp, Expr};
use crate::parts::{FieldRef, OperationType, ParameterPart, QueryPart};
use crate::value::Value;

/// Walks an [`Expr`] and emits field, operator and parameter parts.
///
/// Members without an explicit entity are attributed to `default_entity`
/// and, when the clause being built has one, to its `default_alias`.
/// The emitted parts are atoms; callers wrap them in a clause tagged with
/// the operation they are building (Where, Join, OrderBy, ...).
#[derive(Debug, Clone, Default)]
pub struct ExpressionTranslator {
    default_entity: Option<String>,
    default_alias: Option<String>,
}

impl ExpressionTranslator {
    pub fn new(default_entity: Option<String>) -> Self {
        Self {
            default_entity,
            default_alias: None,
        }
    }

    /// Qualify unqualified members with `alias` instead of the entity's
    /// statement-wide alias.
    pub fn with_alias(mut self, alias: Option<String>) -> Self {
        self.default_alias = alias;
        self
    }

    pub fn translate(&self, expr: &Expr) -> Vec<QueryPart> {
        let mut parts = Vec::new();
        self.visit(expr, &mut parts);
        parts
    }

    /// Translate a property selector (`order_by`, `group_by`, `map`).
    pub fn field(&self, expr: &Expr) -> Option<FieldRef> {
        match expr {
            Expr::Member {
                entity,
                alias,
                field,
            } => Some(self.field_ref(entity.as_deref(), alias.as_deref(), field)),
            Expr::Convert(inner) => self.field(inner),
            _ => None,
        }
    }

    fn field_ref(&self, entity: Option<&str>, alias: Option<&str>, field: &str) -> FieldRef {
        let mut field = FieldRef::new(field);
        match (entity, alias) {
            (_, Some(alias)) => field.entity_alias = Some(alias.to_string()),
            (Some(entity), None) => field.entity = Some(entity.to_string()),
            (None, None) => {
                field.entity = self.default_entity.clone();
                field.entity_alias = self.default_alias.clone();
            }
        }
        field
    }

    fn visit(&self, expr: &Expr, parts: &mut Vec<QueryPart>) {
        match expr {
            Expr::Member { .. } => {
                if let Some(field) = self.field(expr) {
                    parts.push(QueryPart::field(field));
                }
            }
            Expr::Constant(value) => {
                parts.push(QueryPart::parameter(
                    OperationType::None,
                    ParameterPart::value(value.clone()),
                ));
            }
            Expr::Deferred(deferred) => {
                parts.push(QueryPart::parameter(
                    OperationType::None,
                    ParameterPart::deferred(deferred.clone()),
                ));
            }
            Expr::Convert(inner) => self.visit(inner, parts),
            Expr::Binary { op, left, right } => match op.keyword() {
                Some(keyword) => self.visit_binary(*op, keyword, left, right, parts),
                None => self.fallback(expr, parts),
            },
            Expr::Opaque { .. } => self.fallback(expr, parts),
        }
    }

    fn visit_binary(
        &self,
        op: BinaryOp,
        keyword: &str,
        left: &Expr,
        right: &Expr,
        parts: &mut Vec<QueryPart>,
    ) {
        let null_check = match op {
            BinaryOp::Equal => Some(" IS NULL"),
            BinaryOp::NotEqual => Some(" IS NOT NULL"),
            _ => None,
        };

        parts.push(QueryPart::text(OperationType::None, "("));
        match null_check {
            Some(check) if is_null_constant(right) => {
                self.visit(left, parts);
                parts.push(QueryPart::text(OperationType::None, check));
            }
            Some(check) if is_null_constant(left) => {
                self.visit(right, parts);
                parts.push(QueryPart::text(OperationType::None, check));
            }
            _ => {
                self.visit(left, parts);
                parts.push(QueryPart::text(OperationType::None, format!(" {} ", keyword)));
                self.visit(right, parts);
            }
        }
        parts.push(QueryPart::text(OperationType::None, ")"));
    }

    /// Evaluate the whole subexpression once and use the result as a literal.
    fn fallback(&self, expr: &Expr, parts: &mut Vec<QueryPart>) {
        match expr.evaluate() {
            Some(value) => {
                warn!(expression = %expr, "Untranslatable expression evaluated to a literal");
                parts.push(QueryPart::parameter(
                    OperationType::None,
                    ParameterPart::value(value),
                ));
            }
            None => {
                warn!(expression = %expr, "Untranslatable expression written without evaluation");
                self.visit_raw(expr, parts);
            }
        }
    }

    /// Write `expr` operator by operator. Members still become field parts
    /// so they are qualified like any other column.
    fn visit_raw(&self, expr: &Expr, parts: &mut Vec<QueryPart>) {
        match expr {
            Expr::Binary { op, left, right } => {
                parts.push(QueryPart::text(OperationType::None, "("));
                self.visit_raw(left, parts);
                parts.push(QueryPart::text(OperationType::None, format!(" {} ", op.symbol())));
                self.visit_raw(right, parts);
                parts.push(QueryPart::text(OperationType::None, ")"));
            }
            Expr::Convert(inner) => self.visit_raw(inner, parts),
            Expr::Member { .. } | Expr::Constant(_) | Expr::Deferred(_) => self.visit(expr, parts),
            Expr::Opaque { thunk, .. } => {
                parts.push(QueryPart::parameter(
                    OperationType::None,
                    ParameterPart::value(thunk.value().clone()),
                ));
            }
        }
    }
}

fn is_null_constant(expr: &Expr) -> bool {
    matches!(expr, Expr::Constant(Value::Null))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::CompileContext;
    use crate::dialect::Dialect;
    use crate::expr::{col, convert, lit, opaque, qualified, qualified_as};
    use crate::parts::QueryPartsMap;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn render(expr: &Expr) -> String {
        let map = QueryPartsMap::new();
        let ctx = CompileContext::new(&map, Dialect::Sqlite, true);
        let translator = ExpressionTranslator::new(Some("Customer".into()));
        translator
            .translate(expr)
            .iter()
            .map(|p| p.compile(&ctx).unwrap())
            .collect()
    }

    #[test]
    fn test_comparison_uses_keyword_map() {
        assert_eq!(render(&col("Name").eq("Bob")), "(Customer.Name = 'Bob')");
        assert_eq!(render(&col("Age").ne(3)), "(Customer.Age <> 3)");
        assert_eq!(render(&col("Age").le(3)), "(Customer.Age <= 3)");
    }

    #[test]
    fn test_logical_nodes_nest() {
        let expr = col("Age").gt(18).or(qualified("Orders", "Id").lt(5));
        assert_eq!(
            render(&expr),
            "((Customer.Age > 18) OR (Orders.Id < 5))"
        );
    }

    #[test]
    fn test_null_comparison() {
        assert_eq!(render(&col("Name").eq(Value::Null)), "(Customer.Name IS NULL)");
        assert_eq!(render(&col("Name").ne(None::<i64>)), "(Customer.Name IS NOT NULL)");
    }

    #[test]
    fn test_convert_unwraps() {
        assert_eq!(render(&convert(col("Id")).eq(1)), "(Customer.Id = 1)");
    }

    #[test]
    fn test_fallback_evaluates_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let expr = col("Id").eq(opaque("lookup()", move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Value::Int(9)
        }));

        assert_eq!(render(&expr), "(Customer.Id = 9)");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_fallback_raw_text_for_member_arithmetic() {
        assert_eq!(
            render(&col("Price").mul(lit(2)).gt(10)),
            "((Customer.Price * 2) > 10)"
        );
        assert_eq!(
            render(&qualified("Orders", "Total").sub(col("Discount")).le(0)),
            "((Orders.Total - Customer.Discount) <= 0)"
        );
    }

    #[test]
    fn test_default_alias_qualifies_bare_members() {
        let map = QueryPartsMap::new();
        let ctx = CompileContext::new(&map, Dialect::Sqlite, true);
        let translator =
            ExpressionTranslator::new(Some("Employee".into())).with_alias(Some("m".into()));
        let sql: String = translator
            .translate(&col("ReportsTo").eq(qualified_as("e", "EmployeeID")))
            .iter()
            .map(|p| p.compile(&ctx).unwrap())
            .collect();
        assert_eq!(sql, "(m.ReportsTo = e.EmployeeID)");
    }
}
