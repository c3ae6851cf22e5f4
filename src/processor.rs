//! Orchestration of the whole pipeline.
//!
//! `parse` runs the lexer and the parser, resolving extracted injections
//! recursively and substituting their values for the placeholders.
//! `resolve` repeats {prune} until the tree resolves or stops changing
//! textually, bounded by a configurable iteration ceiling; `prune` runs the
//! rewriting engine (from the second iteration on, and skips evaluation
//! entirely when rewriting changed nothing) and then one evaluation pass.
//! When the caller supplies an environment-update callback, it runs once
//! the loop settles; if it bumps the environment's version, resolution is
//! retried from the latest tree without re-parsing.

use crate::{
    ast::Statement,
    error::{EngineError, ParseError, RuntimeError},
    functions::FunctionCatalog,
    interpreter::{
        Evaluation, Interpreter,
        environment::{Environment, ScopeId},
        evaluator::NodeEvaluator,
        symbol_table::SymbolTable,
    },
    lexer::{Injection, Lexer, LexicalGrammar, Scan},
    parser::{Parser, SyntacticalContext, SyntacticalGrammar},
    rewriter::RewritingSystem,
    token::{Token, TokenKind},
    units::UnitCatalog,
};

/// Tunables of the resolve loop.
#[derive(Debug, Clone)]
pub struct ProcessorOptions {
    /// Ceiling on pruning iterations (and on environment-triggered resolve
    /// retries). Hitting it raises [`RuntimeError::ResolutionExhausted`].
    pub max_pruning_runs: usize,
}

impl Default for ProcessorOptions {
    fn default() -> Self {
        Self { max_pruning_runs: 5 }
    }
}

/// The output of [`Processor::parse`].
#[derive(Debug, Clone)]
pub struct Parsed {
    /// The expression as given.
    pub original_expression: String,
    /// The tokens, with resolved injection values substituted in.
    pub tokens:              Vec<Token>,
    /// The injections extracted during lexing.
    pub injections:          Vec<Injection>,
    /// The parsed tree; `None` when an injection is still pending.
    pub ast:                 Option<Statement>,
}

/// The output of [`Processor::resolve`].
#[derive(Debug, Clone)]
pub struct Resolution {
    /// The tree's content before this resolution.
    pub original_content: String,
    /// The content after the final prune.
    pub content:          String,
    /// The final evaluation, resolved or residual.
    pub evaluation:       Evaluation,
}

impl Resolution {
    /// Returns `true` when a concrete value came out.
    #[must_use]
    pub const fn is_resolved(&self) -> bool {
        self.evaluation.is_resolved()
    }
}

/// Per-call options of [`Processor::resolve`].
pub struct ResolveOptions<'a> {
    /// The syntactical context resolution evaluates under.
    pub context:            SyntacticalContext,
    /// The scope to resolve in; the environment's root when absent.
    pub scope:              Option<ScopeId>,
    /// Callback run once the loop settles; bumping the environment version
    /// triggers another resolution from the latest tree.
    pub environment_update: Option<&'a mut dyn FnMut(&mut Environment, &mut SymbolTable)>,
}

impl<'a> ResolveOptions<'a> {
    /// Options with a context, root scope and no callback.
    #[must_use]
    pub const fn new(context: SyntacticalContext) -> Self {
        Self { context,
               scope: None,
               environment_update: None }
    }

    /// Sets the scope to resolve in.
    #[must_use]
    pub const fn with_scope(mut self, scope: ScopeId) -> Self {
        self.scope = Some(scope);
        self
    }

    /// Sets the environment-update callback.
    #[must_use]
    pub fn with_environment_update(mut self,
                                   update: &'a mut dyn FnMut(&mut Environment, &mut SymbolTable))
                                   -> Self {
        self.environment_update = Some(update);
        self
    }
}

/// The processor: lexer, parser, rewriter and interpreter wired together.
#[derive(Debug)]
pub struct Processor {
    lexical_grammar:     LexicalGrammar,
    syntactical_grammar: SyntacticalGrammar,
    rewriting_system:    RewritingSystem,
    node_evaluator:      NodeEvaluator,
    function_catalog:    FunctionCatalog,
    options:             ProcessorOptions,
}

impl Processor {
    /// Wires a processor from its components.
    #[must_use]
    pub const fn new(lexical_grammar: LexicalGrammar,
                     syntactical_grammar: SyntacticalGrammar,
                     rewriting_system: RewritingSystem,
                     node_evaluator: NodeEvaluator,
                     function_catalog: FunctionCatalog,
                     options: ProcessorOptions)
                     -> Self {
        Self { lexical_grammar,
               syntactical_grammar,
               rewriting_system,
               node_evaluator,
               function_catalog,
               options }
    }

    /// Builds a processor with every default: grammars, ruleset, evaluator
    /// hooks, base units and built-in function signatures.
    #[must_use]
    pub fn default_processor() -> Self {
        Self::new(LexicalGrammar::default_grammar(),
                  SyntacticalGrammar::default_grammar(UnitCatalog::with_base_units()),
                  RewritingSystem::default_system(),
                  NodeEvaluator::new(),
                  FunctionCatalog::with_builtins(),
                  ProcessorOptions::default())
    }

    // #region COMPONENT ACCESS (for extension registration)

    /// The lexical grammar, for registering entries.
    pub fn lexical_grammar_mut(&mut self) -> &mut LexicalGrammar {
        &mut self.lexical_grammar
    }

    /// The syntactic grammar, for registering parsers and re-typers.
    pub fn syntactical_grammar_mut(&mut self) -> &mut SyntacticalGrammar {
        &mut self.syntactical_grammar
    }

    /// The rewriting system, for registering rules.
    pub fn rewriting_system_mut(&mut self) -> &mut RewritingSystem {
        &mut self.rewriting_system
    }

    /// The node evaluator, for registering hooks and the dice roller.
    pub fn node_evaluator_mut(&mut self) -> &mut NodeEvaluator {
        &mut self.node_evaluator
    }

    /// The function catalog, for declaring callable names.
    pub fn function_catalog_mut(&mut self) -> &mut FunctionCatalog {
        &mut self.function_catalog
    }

    // #endregion

    /// Parses a string expression into an abstract syntax tree.
    ///
    /// Injections are processed first: each extracted sub-expression goes
    /// through the whole pipeline, and its resolved value replaces the
    /// placeholder token. When an injection stays unresolved, no tree is
    /// produced (`ast` is `None`).
    ///
    /// # Errors
    /// Returns an [`EngineError`] for lexing/parsing failures, for an
    /// unknown injection function, or for hard evaluation failures inside
    /// an injection.
    pub fn parse(&self,
                 expression: &str,
                 environment: &mut Environment,
                 symbols: &mut SymbolTable,
                 context: &SyntacticalContext)
                 -> Result<Parsed, EngineError> {
        let lexer = Lexer::new(&self.lexical_grammar);
        let Scan { mut tokens, injections } = lexer.process(expression).map_err(EngineError::Parse)?;

        let all_resolved = self.inject(&mut tokens, &injections, environment, symbols)?;

        let ast = if all_resolved {
            Some(Parser::process(&self.syntactical_grammar, tokens.clone(), context)
                     .map_err(EngineError::Parse)?)
        } else {
            None
        };

        Ok(Parsed { original_expression: expression.to_string(),
                    tokens,
                    injections,
                    ast })
    }

    /// Processes injected sections and substitutes resulting values into
    /// their placeholders. Returns whether every injection resolved.
    fn inject(&self,
              tokens: &mut [Token],
              injections: &[Injection],
              environment: &mut Environment,
              symbols: &mut SymbolTable)
              -> Result<bool, EngineError> {
        if injections.is_empty() {
            return Ok(true);
        }

        let mut pending = 0usize;

        for injection in injections {
            // 1. The injection function decides the context.
            let context = match injection.name.as_str() {
                "solver" | "evaluate" | "eval" => SyntacticalContext::expression(),
                _ => {
                    return Err(EngineError::Parse(ParseError::UnknownInjectionFunction {
                        name: injection.name.clone(),
                    }));
                },
            };

            // 2. Run the partial expression through the whole pipeline.
            let parsed = self.parse(&injection.expression, environment, symbols, &context)?;
            let Some(ast) = parsed.ast else {
                pending += 1;
                continue;
            };

            let resolution = self.resolve(&ast, environment, symbols, ResolveOptions::new(context))
                                 .map_err(EngineError::Runtime)?;

            // 3. Replace the placeholder with the value's token form.
            let replacement = resolution.evaluation
                                        .value
                                        .as_ref()
                                        .and_then(crate::interpreter::value::RuntimeValue::to_token);
            let Some(replacement) = replacement else {
                pending += 1;
                continue;
            };

            let placeholder = format!("${}", injection.index);
            for token in tokens.iter_mut() {
                if token.kind == TokenKind::InjectionPlaceholder && token.content == placeholder {
                    *token = replacement.clone();
                    break;
                }
            }
        }

        Ok(pending == 0)
    }

    /// Tries to resolve a tree into a value by pruning it as much as
    /// possible, retrying after environment updates.
    ///
    /// # Errors
    /// Returns a [`RuntimeError`] for hard evaluation failures, and
    /// [`RuntimeError::ResolutionExhausted`] when the iteration ceiling is
    /// reached without convergence.
    pub fn resolve(&self,
                   tree: &Statement,
                   environment: &mut Environment,
                   symbols: &mut SymbolTable,
                   mut options: ResolveOptions<'_>)
                   -> Result<Resolution, RuntimeError> {
        self.resolve_run(tree.clone(), environment, symbols, &mut options, 0)
    }

    fn resolve_run(&self,
                   tree: Statement,
                   environment: &mut Environment,
                   symbols: &mut SymbolTable,
                   options: &mut ResolveOptions<'_>,
                   run: usize)
                   -> Result<Resolution, RuntimeError> {
        let limit = self.options.max_pruning_runs;
        let scope = options.scope.unwrap_or_else(|| environment.root());

        let mut latest_tree = tree;
        let mut latest: Option<Resolution> = None;

        // A. Pruning loop: prune until resolved or no textual progress.
        let mut iteration = 0;
        loop {
            let pruning = self.prune(&latest_tree,
                                     environment,
                                     symbols,
                                     scope,
                                     &options.context,
                                     run,
                                     iteration)?;
            let Some(resolution) = pruning else {
                break; // content never changed between prunings
            };

            latest_tree = Statement::expression(resolution.evaluation.node.clone());
            let done = resolution.is_resolved()
                       || resolution.original_content == resolution.content;
            latest = Some(resolution);

            if done {
                break;
            }

            iteration += 1;
            if iteration >= limit {
                return Err(RuntimeError::ResolutionExhausted { limit });
            }
        }

        let Some(resolution) = latest else {
            // the first iteration always evaluates, so this cannot happen
            return Err(RuntimeError::ResolutionExhausted { limit });
        };

        // B. Give the caller a chance to feed the environment; a version
        //    bump means re-resolution can make progress.
        if let Some(update) = options.environment_update.as_deref_mut() {
            let previous = environment.version();
            update(environment, symbols);

            if environment.version() != previous {
                if run + 1 >= limit {
                    return Err(RuntimeError::ResolutionExhausted { limit });
                }
                return self.resolve_run(latest_tree, environment, symbols, options, run + 1);
            }
        }

        Ok(resolution)
    }

    /// Reduces a tree once: simplify (after the first iteration), then
    /// evaluate. Returns `None` when rewriting changed nothing, which
    /// signals the loop to stop.
    #[allow(clippy::too_many_arguments)]
    fn prune(&self,
             tree: &Statement,
             environment: &Environment,
             symbols: &mut SymbolTable,
             scope: ScopeId,
             context: &SyntacticalContext,
             run: usize,
             pruning_run: usize)
             -> Result<Option<Resolution>, RuntimeError> {
        let original_content = tree.content();
        let mut current = tree.clone();

        // 1. Simplify. The first run skips this: easy math evaluates faster
        //    than rule matching, and most formulas are easy math.
        if pruning_run > 0 {
            let (simplified, _) = self.rewriting_system.apply(current)?;
            if simplified.content() == original_content {
                return Ok(None);
            }
            current = simplified;
        }

        // 2. Evaluate the simplified tree.
        let id = format!("{}i{pruning_run}", run_letter(run));
        let mut interpreter = Interpreter::new(id,
                                               environment,
                                               scope,
                                               symbols,
                                               &self.node_evaluator,
                                               &self.lexical_grammar,
                                               &self.function_catalog,
                                               *context);
        let evaluation = interpreter.process(&current)?;
        let content = evaluation.content();

        Ok(Some(Resolution { original_content,
                             content,
                             evaluation }))
    }
}

/// Letter designation for a resolution run (`a`, `b`, ...), used in tree
/// ids for symbol references.
fn run_letter(run: usize) -> char {
    char::from(b'a' + u8::try_from(run % 26).unwrap_or(0))
}
