use crate::error::{KarvaError, Result};
use crate::functions::{Function, FunctionRegistry};
use rand::Rng;
use std::collections::VecDeque;
use std::sync::Arc;

use super::operators::SymbolSampler;

/// One position of a linear chromosome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Symbol {
    /// Function symbol, resolved through the registry at decode time
    Func(String),
    /// Input terminal `d{i}`, the i-th component of the input vector
    Input(usize),
    /// Constant terminal `c{i}`, indexing the gene's constant table
    Const(usize),
}

impl Symbol {
    fn parse(token: &str) -> Symbol {
        if let Some(rest) = token.strip_prefix('d') {
            if let Ok(index) = rest.parse::<usize>() {
                return Symbol::Input(index);
            }
        }
        if let Some(rest) = token.strip_prefix('c') {
            if let Ok(index) = rest.parse::<usize>() {
                return Symbol::Const(index);
            }
        }
        Symbol::Func(token.to_string())
    }

    pub fn is_function(&self) -> bool {
        matches!(self, Symbol::Func(_))
    }
}

impl std::fmt::Display for Symbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Symbol::Func(symbol) => write!(f, "{}", symbol),
            Symbol::Input(index) => write!(f, "d{}", index),
            Symbol::Const(index) => write!(f, "c{}", index),
        }
    }
}

/// A fixed-length linear chromosome in Karva notation.
///
/// The first `head_size` positions (the head) may hold functions or
/// terminals; the remaining positions (the tail) hold terminals only, so any
/// breadth-first decode completes before the string runs out. The tail
/// length is derived as `head_size * (max_arity - 1) + 1` at construction
/// and every operator preserves the total length. Symbols past the point
/// where decoding completes are non-coding: they are kept in storage and
/// stay available as raw material for transposition, but never evaluate.
#[derive(Clone)]
pub struct Gene {
    pub(crate) symbols: Vec<Symbol>,
    head_size: usize,
    constants: Vec<f64>,
    registry: Arc<FunctionRegistry>,
}

impl Gene {
    /// Generate a random constraint-valid gene.
    ///
    /// Constants, if configured, are drawn uniformly from [-10, 10).
    pub fn random<R: Rng>(
        head_size: usize,
        sampler: &SymbolSampler,
        registry: Arc<FunctionRegistry>,
        rng: &mut R,
    ) -> Gene {
        let tail_size = head_size * (sampler.max_arity() - 1) + 1;
        let mut symbols = Vec::with_capacity(head_size + tail_size);
        for _ in 0..head_size {
            symbols.push(sampler.head_symbol(rng));
        }
        for _ in 0..tail_size {
            symbols.push(sampler.tail_symbol(rng));
        }
        let constants = (0..sampler.num_constants())
            .map(|_| rng.gen_range(-10.0..10.0))
            .collect();
        Gene {
            symbols,
            head_size,
            constants,
            registry,
        }
    }

    /// Parse a dot-separated Karva string, e.g. `"*.+.d0.d0.d0"`.
    ///
    /// Function symbols are validated against the registry and rejected in
    /// tail positions.
    pub fn parse(karva: &str, head_size: usize, registry: Arc<FunctionRegistry>) -> Result<Gene> {
        if head_size == 0 {
            return Err(KarvaError::Representation(
                "head size must be at least 1".to_string(),
            ));
        }
        let tokens: Vec<&str> = karva.split('.').collect();
        if tokens.len() <= head_size {
            return Err(KarvaError::Representation(format!(
                "chromosome {:?} has no tail for head size {}",
                karva, head_size
            )));
        }
        let mut symbols = Vec::with_capacity(tokens.len());
        for (index, token) in tokens.iter().enumerate() {
            if token.is_empty() {
                return Err(KarvaError::Representation(format!(
                    "empty symbol at position {} in {:?}",
                    index, karva
                )));
            }
            let symbol = Symbol::parse(token);
            if let Symbol::Func(name) = &symbol {
                registry.resolve(name)?;
                if index >= head_size {
                    return Err(KarvaError::Representation(format!(
                        "function symbol {:?} at tail position {}",
                        name, index
                    )));
                }
            }
            symbols.push(symbol);
        }
        Ok(Gene {
            symbols,
            head_size,
            constants: Vec::new(),
            registry,
        })
    }

    /// Attach a constant table for `c{i}` terminals (parsed genes start
    /// without one).
    pub fn set_constants(&mut self, constants: Vec<f64>) {
        self.constants = constants;
    }

    pub fn head_size(&self) -> usize {
        self.head_size
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }

    /// The linear chromosome as a dot-separated Karva string.
    pub fn karva(&self) -> String {
        let tokens: Vec<String> = self.symbols.iter().map(|s| s.to_string()).collect();
        tokens.join(".")
    }

    fn node_for(&self, index: usize) -> Result<Node> {
        match &self.symbols[index] {
            Symbol::Func(name) => Ok(Node::Call {
                function: self.registry.resolve(name)?,
                children: Vec::new(),
            }),
            Symbol::Input(input) => Ok(Node::Input(*input)),
            Symbol::Const(slot) => self
                .constants
                .get(*slot)
                .map(|value| Node::Const(*value))
                .ok_or_else(|| {
                    KarvaError::Representation(format!(
                        "constant c{} out of range (table holds {})",
                        slot,
                        self.constants.len()
                    ))
                }),
        }
    }

    /// Decode the linear string into an expression tree.
    ///
    /// Level-order consumption: each dequeued function node takes the next
    /// `arity` symbols as its children, terminals consume nothing. Decoding
    /// stops when the queue empties; later symbols are non-coding.
    pub fn decode(&self) -> Result<Tree> {
        let mut nodes = vec![self.node_for(0)?];
        let mut queue = VecDeque::new();
        if nodes[0].is_call() {
            queue.push_back(0);
        }
        let mut cursor = 1;
        while let Some(parent) = queue.pop_front() {
            let arity = match &nodes[parent] {
                Node::Call { function, .. } => function.arity(),
                _ => 0,
            };
            for _ in 0..arity {
                if cursor >= self.symbols.len() {
                    return Err(KarvaError::Representation(format!(
                        "chromosome {:?} exhausted during decode",
                        self.karva()
                    )));
                }
                let node = self.node_for(cursor)?;
                cursor += 1;
                let child = nodes.len();
                let is_call = node.is_call();
                nodes.push(node);
                if is_call {
                    queue.push_back(child);
                }
                if let Node::Call { children, .. } = &mut nodes[parent] {
                    children.push(child);
                }
            }
        }
        Ok(Tree { nodes })
    }

    /// Evaluate the decoded tree against one input vector.
    ///
    /// Fails softly: a gene that cannot decode scores `NaN` instead of
    /// aborting the run, and numeric domain errors propagate as `NaN`/`±Inf`
    /// per IEEE semantics.
    pub fn evaluate(&self, inputs: &[f64]) -> f64 {
        match self.decode() {
            Ok(tree) => tree.evaluate(inputs),
            Err(_) => f64::NAN,
        }
    }

    /// Render the coding region as a human-readable expression.
    ///
    /// `variables` maps input indices to display names; missing entries fall
    /// back to `d{i}`.
    pub fn expression(&self, variables: &[&str]) -> Result<String> {
        Ok(self.decode()?.render(variables))
    }

    /// Replace one uniformly-chosen symbol with a class-valid replacement:
    /// any weighted function/terminal in the head, terminal-only in the tail.
    pub fn point_mutate<R: Rng>(&mut self, sampler: &SymbolSampler, rng: &mut R) {
        let index = rng.gen_range(0..self.symbols.len());
        self.symbols[index] = if index < self.head_size {
            sampler.head_symbol(rng)
        } else {
            sampler.tail_symbol(rng)
        };
    }

    /// Insertion-sequence transposition: copy a segment of length 1..=`bound`
    /// from anywhere in the gene and splice it into the head at a random
    /// position past the root. Displaced head symbols shift right and fall
    /// off at the head boundary; the tail is untouched.
    pub fn is_transpose<R: Rng>(&mut self, bound: usize, rng: &mut R) {
        if self.head_size < 2 || bound == 0 {
            return;
        }
        let len = self.symbols.len();
        let seg_len = rng.gen_range(1..=bound.min(len));
        let source = rng.gen_range(0..=len - seg_len);
        let segment: Vec<Symbol> = self.symbols[source..source + seg_len].to_vec();
        let target = rng.gen_range(1..self.head_size);

        let mut head = Vec::with_capacity(self.head_size + seg_len);
        head.extend_from_slice(&self.symbols[..target]);
        head.extend(segment);
        head.extend_from_slice(&self.symbols[target..self.head_size]);
        head.truncate(self.head_size);
        for (index, symbol) in head.into_iter().enumerate() {
            self.symbols[index] = symbol;
        }
    }

    /// Root insertion-sequence transposition: copy a segment starting at a
    /// function symbol and splice it at position 0, keeping the root a
    /// function. No-op when the head holds no function symbol.
    pub fn ris_transpose<R: Rng>(&mut self, bound: usize, rng: &mut R) {
        if bound == 0 {
            return;
        }
        let function_starts: Vec<usize> = (0..self.head_size)
            .filter(|&index| self.symbols[index].is_function())
            .collect();
        if function_starts.is_empty() {
            return;
        }
        let start = function_starts[rng.gen_range(0..function_starts.len())];
        let len = self.symbols.len();
        let seg_len = rng.gen_range(1..=bound.min(len - start));
        let segment: Vec<Symbol> = self.symbols[start..start + seg_len].to_vec();

        let mut head = segment;
        head.extend_from_slice(&self.symbols[..self.head_size]);
        head.truncate(self.head_size);
        for (index, symbol) in head.into_iter().enumerate() {
            self.symbols[index] = symbol;
        }
    }
}

impl PartialEq for Gene {
    fn eq(&self, other: &Self) -> bool {
        self.symbols == other.symbols
            && self.head_size == other.head_size
            && self.constants == other.constants
    }
}

impl std::fmt::Debug for Gene {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gene")
            .field("karva", &self.karva())
            .field("head_size", &self.head_size)
            .field("constants", &self.constants)
            .finish()
    }
}

/// Decoded expression tree over an index-based arena.
///
/// Node 0 is the root; children are integer references into `nodes`, so one
/// decode makes one allocation pass and evaluation walks indices.
pub struct Tree {
    nodes: Vec<Node>,
}

#[derive(Clone)]
enum Node {
    Call {
        function: Arc<dyn Function>,
        children: Vec<usize>,
    },
    Input(usize),
    Const(f64),
}

impl Node {
    fn is_call(&self) -> bool {
        matches!(self, Node::Call { .. })
    }
}

impl Tree {
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Post-order evaluation with fixed left-to-right argument order.
    /// Out-of-range input indices resolve to `NaN`.
    pub fn evaluate(&self, inputs: &[f64]) -> f64 {
        self.eval_node(0, inputs)
    }

    fn eval_node(&self, index: usize, inputs: &[f64]) -> f64 {
        match &self.nodes[index] {
            Node::Input(input) => inputs.get(*input).copied().unwrap_or(f64::NAN),
            Node::Const(value) => *value,
            Node::Call { function, children } => {
                let args: Vec<f64> = children
                    .iter()
                    .map(|&child| self.eval_node(child, inputs))
                    .collect();
                function.apply(&args)
            }
        }
    }

    pub fn render(&self, variables: &[&str]) -> String {
        self.render_node(0, variables)
    }

    fn render_node(&self, index: usize, variables: &[&str]) -> String {
        match &self.nodes[index] {
            Node::Input(input) => variables
                .get(*input)
                .map(|name| name.to_string())
                .unwrap_or_else(|| format!("d{}", input)),
            Node::Const(value) => format!("{}", value),
            Node::Call { function, children } => {
                let args: Vec<String> = children
                    .iter()
                    .map(|&child| self.render_node(child, variables))
                    .collect();
                function.render(&args)
            }
        }
    }
}
