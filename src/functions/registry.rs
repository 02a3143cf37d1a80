use crate::error::{KarvaError, Result};
use crate::functions::math::{Abs, Add, Div, Exp, Ln, Max, Min, Mul, Neg, Pow, Sqrt, Sub};
use crate::functions::traits::{FuncWeight, Function};
use std::collections::HashMap;
use std::sync::Arc;

/// Lookup table from function symbol to its operation.
pub struct FunctionRegistry {
    functions: HashMap<String, Arc<dyn Function>>,
}

impl FunctionRegistry {
    /// Registry holding the built-in floating-point function set.
    pub fn new() -> Self {
        let mut registry = Self {
            functions: HashMap::new(),
        };
        registry.register_builtins();
        registry
    }

    pub fn get(&self, symbol: &str) -> Option<Arc<dyn Function>> {
        self.functions.get(symbol).cloned()
    }

    /// Resolve a symbol, turning a miss into the crate error.
    pub fn resolve(&self, symbol: &str) -> Result<Arc<dyn Function>> {
        self.get(symbol)
            .ok_or_else(|| KarvaError::UnknownSymbol(symbol.to_string()))
    }

    /// Maximum arity across a configured weight table.
    ///
    /// This is the `n_max` that sizes gene tails; an unknown or zero-weight
    /// symbol table is a configuration error, not a runtime one.
    pub fn max_arity(&self, weights: &[FuncWeight]) -> Result<usize> {
        if weights.is_empty() {
            return Err(KarvaError::Configuration(
                "function weight table is empty".to_string(),
            ));
        }
        let mut max = 0;
        for fw in weights {
            let function = self.resolve(&fw.symbol)?;
            max = max.max(function.arity());
        }
        Ok(max)
    }

    fn register_builtins(&mut self) {
        let functions: Vec<Arc<dyn Function>> = vec![
            Arc::new(Add),
            Arc::new(Sub),
            Arc::new(Mul),
            Arc::new(Div),
            Arc::new(Pow),
            Arc::new(Min),
            Arc::new(Max),
            Arc::new(Neg),
            Arc::new(Abs),
            Arc::new(Sqrt),
            Arc::new(Ln),
            Arc::new(Exp),
        ];

        for function in functions {
            self.functions
                .insert(function.symbol().to_string(), function);
        }
    }
}

impl Default for FunctionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
