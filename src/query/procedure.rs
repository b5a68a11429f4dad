//! Stored procedure calls.
//!
//! A call compiles to an optional block of `DECLARE` lines for output
//! parameters, the `EXEC` line, and one trailing `SELECT` returning the
//! output values:
//!
//! ```text
//! DECLARE @Total int = 0
//! EXEC GetTotal @Id=1, @Total=@Total OUTPUT
//! SELECT @Total AS Total
//! ```

use crate::compiler::{CompiledQuery, QueryCompiler};
use crate::error::{PartsError, PartsResult};
use crate::expr::Expr;
use crate::parts::{OperationType, ParameterPart, QueryPart, QueryPartsMap};
use crate::value::{Deferred, SqlType, Value};

pub struct ProcedureQuery {
    map: QueryPartsMap,
    compiler: QueryCompiler,
}

impl ProcedureQuery {
    pub fn new(compiler: QueryCompiler, procedure: &str) -> PartsResult<Self> {
        if procedure.trim().is_empty() {
            return Err(PartsError::missing("procedure", "a procedure name is required"));
        }
        Ok(Self {
            map: QueryPartsMap::procedure(procedure),
            compiler,
        })
    }

    /// Positional parameter.
    pub fn param(self, value: impl Into<Value>) -> Self {
        self.push(ParameterPart::value(value))
    }

    /// Named parameter (`@name=value`).
    pub fn param_named(self, name: &str, value: impl Into<Value>) -> Self {
        self.push(ParameterPart::value(value).named(variable(name)))
    }

    /// Parameter whose value is computed when the call is compiled.
    pub fn param_deferred(
        self,
        name: Option<&str>,
        eval: impl Fn() -> Value + Send + Sync + 'static,
    ) -> Self {
        let mut param = ParameterPart::deferred(Deferred::new(eval));
        if let Some(name) = name {
            param = param.named(variable(name));
        }
        self.push(param)
    }

    /// Parameter taken from an expression.
    pub fn param_expr(self, name: Option<&str>, expr: Expr) -> Self {
        let mut param = ParameterPart::expr(expr);
        if let Some(name) = name {
            param = param.named(variable(name));
        }
        self.push(param)
    }

    fn push(mut self, param: ParameterPart) -> Self {
        self.map
            .add(QueryPart::parameter(OperationType::Parameter, param));
        self
    }

    /// Output parameter, returned through the trailing SELECT as a column
    /// named `name`.
    pub fn output(mut self, name: &str, ty: SqlType, initial: Option<Value>) -> PartsResult<Self> {
        let name = name.trim_start_matches('@').to_string();
        if name.is_empty() {
            return Err(PartsError::missing("name", "an output parameter needs a name"));
        }

        let declared = name.clone();
        self.map
            .add(QueryPart::deferred(OperationType::OutParameterPrefix, move |ctx| {
                let dialect = ctx.dialect();
                let mut line = format!("DECLARE @{} {}", declared, dialect.map_type(ty));
                if let Some(literal) = initial
                    .as_ref()
                    .and_then(|v| dialect.format_literal(v, Some(ty)))
                {
                    line.push_str(" = ");
                    line.push_str(&literal);
                }
                line
            }));
        self.map.add(QueryPart::text(
            OperationType::Parameter,
            format!("@{0}=@{0} OUTPUT", name),
        ));
        self.map.add(QueryPart::text(
            OperationType::OutParameterSuffix,
            format!("@{0} AS {0}", name),
        ));
        Ok(self)
    }

    pub fn compile(self) -> PartsResult<CompiledQuery> {
        self.compiler.compile(self.map)
    }
}

fn variable(name: &str) -> String {
    if name.starts_with('@') {
        name.to_string()
    } else {
        format!("@{}", name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::Dialect;
    use crate::expr::{lit, opaque};
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn compiler() -> QueryCompiler {
        QueryCompiler::new(Dialect::SqlServer)
    }

    #[test]
    fn test_exec_without_outputs_has_no_select() {
        let begin = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap();
        let sql = ProcedureQuery::new(compiler(), "SalesByYear")
            .unwrap()
            .param_named("BeginDate", begin)
            .param_named("@EndDate", begin)
            .compile()
            .unwrap();
        assert_eq!(
            sql.sql(),
            "EXEC SalesByYear @BeginDate='1970-01-01', @EndDate='1970-01-01'"
        );
    }

    #[test]
    fn test_positional_parameters() {
        let sql = ProcedureQuery::new(compiler(), "CustOrderHist")
            .unwrap()
            .param("ALFKI")
            .param(true)
            .param_expr(None, lit(20).mul(2))
            .compile()
            .unwrap();
        assert_eq!(sql.sql(), "EXEC CustOrderHist 'ALFKI', 1, 40");
    }

    #[test]
    fn test_outputs_in_declaration_order() {
        let sql = ProcedureQuery::new(compiler(), "GetTotals")
            .unwrap()
            .param_named("Id", 1)
            .output("Total", SqlType::Int, Some(Value::Int(0)))
            .unwrap()
            .output("@Name", SqlType::String, None)
            .unwrap()
            .compile()
            .unwrap();
        assert_eq!(
            sql.sql(),
            "DECLARE @Total int = 0\n\
             DECLARE @Name nvarchar(max)\n\
             EXEC GetTotals @Id=1, @Total=@Total OUTPUT, @Name=@Name OUTPUT\n\
             SELECT @Total AS Total, @Name AS Name"
        );
        assert_eq!(sql.sql().matches("SELECT").count(), 1);
    }

    #[test]
    fn test_deferred_parameter_evaluated_at_compile() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let query = ProcedureQuery::new(compiler(), "Touch")
            .unwrap()
            .param_deferred(Some("At"), move || {
                counter.fetch_add(1, Ordering::SeqCst);
                Value::Int(5)
            });
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        let sql = query.compile().unwrap();
        assert_eq!(sql.sql(), "EXEC Touch @At=5");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_opaque_expression_parameter() {
        let sql = ProcedureQuery::new(compiler(), "Touch")
            .unwrap()
            .param_expr(Some("Key"), opaque("key()", || Value::from("k1")))
            .compile()
            .unwrap();
        assert_eq!(sql.sql(), "EXEC Touch @Key='k1'");
    }

    #[test]
    fn test_empty_procedure_name_rejected() {
        assert!(matches!(
            ProcedureQuery::new(compiler(), " "),
            Err(PartsError::MissingArgument { .. })
        ));
    }

    #[test]
    fn test_procedures_unsupported_on_sqlite() {
        let err = ProcedureQuery::new(QueryCompiler::new(Dialect::Sqlite), "P")
            .unwrap()
            .compile()
            .unwrap_err();
        assert!(matches!(err, PartsError::Unsupported { dialect: "SQLite", .. }));
    }
}
