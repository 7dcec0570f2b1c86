use crate::core::error::AppError;
use crate::core::types::ErrorCategory;
use rhai::packages::{Package, StandardPackage};
use rhai::{Array, Dynamic, Engine, Map, Scope, AST};
use serde_json::{Map as JsonMap, Number, Value};

/// Named JSON values exposed to expressions as top-level variables.
#[derive(Debug, Clone, Default)]
pub struct EvaluationContext {
    bindings: Vec<(String, Value)>,
}

impl EvaluationContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `value` under `name`, replacing any previous binding.
    pub fn with(mut self, name: impl Into<String>, value: Value) -> Self {
        let name = name.into();
        self.bindings.retain(|(existing, _)| existing != &name);
        self.bindings.push((name, value));
        self
    }

    /// Context exposing `value` as `context`, the binding used for pipeline variables.
    pub fn from_variables(value: Value) -> Self {
        Self::new().with("context", value)
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.bindings
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, value)| value)
    }
}

/// Expression evaluation engine using a locked-down Rhai configuration.
pub struct ExpressionEngine {
    engine: Engine,
}

impl Default for ExpressionEngine {
    fn default() -> Self {
        let mut engine = Engine::new_raw();
        engine.register_global_module(StandardPackage::new().as_shared_module());
        engine.set_max_operations(50_000);
        engine.set_max_call_levels(64);
        engine.set_max_expr_depths(64, 64);
        engine.on_print(|_| {});
        engine.on_debug(|_, _, _| {});
        ExpressionEngine { engine }
    }
}

impl ExpressionEngine {
    /// Compile the given expression string into an AST.
    pub fn compile(&self, expr: &str) -> Result<AST, AppError> {
        self.engine.compile_expression(expr).map_err(|err| {
            AppError::new(
                ErrorCategory::ExpressionError,
                format!("expression compile error: {}", err),
            )
            .with_code("PLW-EXPR-001")
        })
    }

    /// Evaluate the given expression string against the provided context.
    pub fn evaluate(&self, expr: &str, ctx: &EvaluationContext) -> Result<Value, AppError> {
        let mut scope = Scope::new();
        for (name, value) in &ctx.bindings {
            scope.push_dynamic(name.as_str(), to_dynamic(value));
        }

        let result = self
            .engine
            .eval_expression_with_scope::<Dynamic>(&mut scope, expr)
            .map_err(|err| {
                AppError::new(
                    ErrorCategory::ExpressionError,
                    format!("expression execution error: {}", err),
                )
                .with_code("PLW-EXPR-001")
            })?;
        Ok(from_dynamic(result))
    }

    /// Evaluate an expression that must produce a boolean.
    pub fn evaluate_bool(&self, expr: &str, ctx: &EvaluationContext) -> Result<bool, AppError> {
        match self.evaluate(expr, ctx)? {
            Value::Bool(flag) => Ok(flag),
            other => Err(AppError::new(
                ErrorCategory::ExpressionError,
                format!(
                    "expression '{}' must evaluate to a boolean, got {}",
                    expr, other
                ),
            )
            .with_code("PLW-APPR-003")),
        }
    }
}

fn to_dynamic(value: &Value) -> Dynamic {
    match value {
        Value::Null => Dynamic::UNIT,
        Value::Bool(b) => Dynamic::from(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Dynamic::from(i)
            } else if let Some(f) = n.as_f64() {
                Dynamic::from(f)
            } else {
                Dynamic::from(0_i64)
            }
        }
        Value::String(s) => Dynamic::from(s.clone()),
        Value::Array(items) => {
            let arr: Array = items.iter().map(to_dynamic).collect();
            Dynamic::from_array(arr)
        }
        Value::Object(map) => {
            let mut rhai_map = Map::new();
            for (key, value) in map {
                rhai_map.insert(key.into(), to_dynamic(value));
            }
            Dynamic::from_map(rhai_map)
        }
    }
}

fn from_dynamic(value: Dynamic) -> Value {
    if value.is_unit() {
        return Value::Null;
    }
    if let Some(b) = value.clone().try_cast::<bool>() {
        return Value::Bool(b);
    }
    if let Some(i) = value.clone().try_cast::<i64>() {
        return Value::Number(Number::from(i));
    }
    if let Some(f) = value.clone().try_cast::<f64>() {
        if let Some(num) = Number::from_f64(f) {
            return Value::Number(num);
        }
    }
    if let Some(s) = value.clone().try_cast::<String>() {
        return Value::String(s);
    }
    if let Some(arr) = value.clone().try_cast::<Array>() {
        return Value::Array(arr.into_iter().map(from_dynamic).collect());
    }
    if let Some(map) = value.clone().try_cast::<Map>() {
        let mut json_map = JsonMap::new();
        for (key, value) in map {
            json_map.insert(key.into(), from_dynamic(value));
        }
        return Value::Object(json_map);
    }
    Value::Null
}
