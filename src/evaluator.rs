use crate::ast::{Accessor, BinaryOp, Expr, LogicalOp, Program, Stmt, UnaryOp};
use crate::config::{AssignScope, InterpreterConfig};
use crate::console::{Console, InputReply, Severity, DEFAULT_INPUT_PROMPT};
use crate::environment::{EnvRef, Environment};
use crate::error::{FlexError, Span};
use crate::stack::ensure_sufficient_stack;
use crate::stdlib::{Binding, Registry};
use crate::value::{format_number, Closure, Value};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

// Index writes past this point are refused instead of allocating the gap.
const MAX_ARRAY_INDEX: usize = 10_000_000;

/// Outcome of executing one statement. `Return` unwinds to the nearest call.
#[derive(Debug, Clone, PartialEq)]
pub enum Flow {
    Normal,
    Return(Value),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallFrame {
    pub name: String,
    /// Line of the call site.
    pub line: usize,
}

/// Observer invoked before every non-block statement. Returning an error
/// aborts the run with that error.
pub trait StatementHook {
    fn before_statement(&mut self, evaluator: &Evaluator, line: usize) -> Result<(), FlexError>;

    /// Called when a loop is about to run its body again.
    fn loop_iteration(&mut self) {}
}

pub struct Evaluator {
    globals: EnvRef,
    environment: EnvRef,
    registry: Arc<Registry>,
    console: Box<dyn Console>,
    config: InterpreterConfig,
    call_stack: Vec<CallFrame>,
    stop: Arc<AtomicBool>,
    hook: Option<Box<dyn StatementHook>>,
    rng: StdRng,
    cursor: usize,
    last_value: Value,
}

impl Evaluator {
    pub fn new(registry: Arc<Registry>, console: Box<dyn Console>, config: InterpreterConfig) -> Self {
        let globals = Environment::new_global();
        registry.install(&globals);

        let rng = match config.random_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Self {
            environment: Rc::clone(&globals),
            globals,
            registry,
            console,
            config,
            call_stack: Vec::new(),
            stop: Arc::new(AtomicBool::new(false)),
            hook: None,
            rng,
            cursor: 0,
            last_value: Value::Null,
        }
    }

    /// Standard natives, default configuration.
    pub fn with_console(console: Box<dyn Console>) -> Self {
        Self::new(
            Arc::new(Registry::standard()),
            console,
            InterpreterConfig::default(),
        )
    }

    /// Runs every top-level statement in order and returns the value of the
    /// last top-level expression statement.
    pub fn execute_program(&mut self, program: &Program) -> Result<Value, FlexError> {
        self.last_value = Value::Null;

        for (index, statement) in program.statements.iter().enumerate() {
            self.cursor = index;
            if let Flow::Return(_) = self.execute_statement(statement)? {
                tracing::debug!(line = statement.line(), "top-level return ends the program");
                break;
            }
        }

        self.cursor = program.statements.len();
        Ok(std::mem::replace(&mut self.last_value, Value::Null))
    }

    pub fn execute_statement(&mut self, stmt: &Stmt) -> Result<Flow, FlexError> {
        ensure_sufficient_stack(|| self.execute_statement_inner(stmt))
    }

    fn execute_statement_inner(&mut self, stmt: &Stmt) -> Result<Flow, FlexError> {
        if self.is_stopped() {
            return Err(FlexError::halted().with_span_if_absent(*stmt.span()));
        }
        if !matches!(stmt, Stmt::Block { .. }) {
            self.notify_hook(stmt.line())?;
        }
        tracing::trace!(line = stmt.line(), depth = self.call_depth(), "statement");

        match stmt {
            Stmt::Expression { expr, .. } => {
                let value = self.evaluate_expression(expr)?;
                if self.at_top_level() {
                    self.last_value = value;
                }
                Ok(Flow::Normal)
            }
            Stmt::Print { expr, newline, .. } => {
                let text = self.evaluate_expression(expr)?.to_string();
                if *newline {
                    self.console.write_line(&text, Severity::Output);
                } else {
                    self.console.write(&text);
                }
                Ok(Flow::Normal)
            }
            Stmt::Input { prompt, span, .. } => {
                let prompt = match prompt {
                    Some(expr) => self.evaluate_expression(expr)?.to_string(),
                    None => DEFAULT_INPUT_PROMPT.to_string(),
                };
                self.read_input(&prompt)
                    .map_err(|error| error.with_span_if_absent(*span))?;
                Ok(Flow::Normal)
            }
            Stmt::Assign { name, value, span } => {
                let value = self.evaluate_expression(value)?;
                self.assign_variable(name, value, span)?;
                Ok(Flow::Normal)
            }
            Stmt::Block { statements, .. } => {
                let env = Environment::new_child(&self.environment);
                self.execute_block(statements, env)
            }
            Stmt::If {
                condition,
                then_branch,
                else_branch,
                ..
            } => {
                let condition_value = self.evaluate_expression(condition)?;
                if condition_value.is_truthy() {
                    self.execute_statement(then_branch)
                } else if let Some(else_stmt) = else_branch {
                    self.execute_statement(else_stmt)
                } else {
                    Ok(Flow::Normal)
                }
            }
            Stmt::While { condition, body, .. } => {
                while self.evaluate_expression(condition)?.is_truthy() {
                    if let Some(hook) = self.hook.as_mut() {
                        hook.loop_iteration();
                    }
                    if let Flow::Return(value) = self.execute_statement(body)? {
                        return Ok(Flow::Return(value));
                    }
                    if self.config.yield_in_loops {
                        thread::yield_now();
                    }
                }
                Ok(Flow::Normal)
            }
            Stmt::Function(declaration) => {
                let closure = Value::Closure(Rc::new(Closure {
                    declaration: Rc::clone(declaration),
                    env: Rc::clone(&self.environment),
                }));
                self.environment
                    .borrow_mut()
                    .define(declaration.name.clone(), closure);
                Ok(Flow::Normal)
            }
            Stmt::Return { value, .. } => {
                let value = match value {
                    Some(expr) => self.evaluate_expression(expr)?,
                    None => Value::Null,
                };
                Ok(Flow::Return(value))
            }
        }
    }

    /// Executes `statements` with `env` as the current frame, restoring the
    /// previous frame afterwards whether or not execution succeeded.
    pub fn execute_block(&mut self, statements: &[Stmt], env: EnvRef) -> Result<Flow, FlexError> {
        let previous = std::mem::replace(&mut self.environment, env);

        let mut result = Ok(Flow::Normal);
        for statement in statements {
            match self.execute_statement(statement) {
                Ok(Flow::Normal) => {}
                other => {
                    result = other;
                    break;
                }
            }
        }

        let frame = std::mem::replace(&mut self.environment, previous);
        Environment::release(frame);
        result
    }

    pub fn evaluate_expression(&mut self, expr: &Expr) -> Result<Value, FlexError> {
        ensure_sufficient_stack(|| self.evaluate_expression_inner(expr))
    }

    fn evaluate_expression_inner(&mut self, expr: &Expr) -> Result<Value, FlexError> {
        match expr {
            Expr::Literal { value, .. } => Ok(value.clone()),
            Expr::Variable { name, span } => self
                .environment
                .borrow()
                .get(name)
                .map_err(|error| error.with_span_if_absent(*span)),
            Expr::Assign { name, value, span } => {
                let value = self.evaluate_expression(value)?;
                self.assign_variable(name, value.clone(), span)?;
                Ok(value)
            }
            Expr::Binary {
                left,
                operator,
                right,
                span,
            } => {
                let left_val = self.evaluate_expression(left)?;
                let right_val = self.evaluate_expression(right)?;
                self.evaluate_binary_op(*operator, left_val, right_val, span)
            }
            Expr::Logical {
                left,
                operator,
                right,
                ..
            } => {
                let left_val = self.evaluate_expression(left)?;

                match operator {
                    LogicalOp::Or => {
                        if left_val.is_truthy() {
                            Ok(left_val)
                        } else {
                            self.evaluate_expression(right)
                        }
                    }
                    LogicalOp::And => {
                        if !left_val.is_truthy() {
                            Ok(left_val)
                        } else {
                            self.evaluate_expression(right)
                        }
                    }
                }
            }
            Expr::Unary {
                operator,
                operand,
                span,
            } => {
                let operand_val = self.evaluate_expression(operand)?;
                match operator {
                    UnaryOp::Negate => match operand_val {
                        Value::Number(n) => Ok(Value::Number(-n)),
                        _ => Err(FlexError::runtime(*span, "Operand must be a number.")),
                    },
                    UnaryOp::Not => Ok(Value::Bool(!operand_val.is_truthy())),
                }
            }
            Expr::Call { callee, args, span } => {
                let function_value = self.evaluate_expression(callee)?;
                let mut arg_values = Vec::with_capacity(args.len());
                for arg in args {
                    arg_values.push(self.evaluate_expression(arg)?);
                }
                self.call_value(&function_value, arg_values, *span)
            }
            Expr::Grouping { expr, .. } => self.evaluate_expression(expr),
            Expr::Array { elements, .. } => {
                let mut values = Vec::with_capacity(elements.len());
                for element in elements {
                    values.push(self.evaluate_expression(element)?);
                }
                Ok(Value::new_array(values))
            }
            Expr::Get { object, key, span } => {
                let object_value = self.evaluate_expression(object)?;
                match key {
                    Accessor::Property(name) => self.get_property(&object_value, name, span),
                    Accessor::Index(index) => {
                        let index_value = self.evaluate_expression(index)?;
                        self.get_index(&object_value, &index_value, span)
                    }
                }
            }
            Expr::Set {
                object,
                key,
                value,
                span,
            } => {
                let object_value = self.evaluate_expression(object)?;
                if let Value::Null = object_value {
                    return Err(FlexError::runtime(*span, "Cannot set property of null."));
                }
                match key {
                    Accessor::Property(name) => Err(FlexError::runtime(
                        *span,
                        format!(
                            "Cannot set property '{}' on value of type {}.",
                            name,
                            object_value.type_name()
                        ),
                    )
                    .with_help("Only array elements can be assigned, e.g. items[0] = value;")),
                    Accessor::Index(index) => {
                        let index_value = self.evaluate_expression(index)?;
                        let value = self.evaluate_expression(value)?;
                        self.set_index(&object_value, &index_value, value.clone(), span)?;
                        Ok(value)
                    }
                }
            }
        }
    }

    /// Calls a closure or native with already-evaluated arguments.
    pub fn call_value(&mut self, callee: &Value, args: Vec<Value>, span: Span) -> Result<Value, FlexError> {
        match callee {
            Value::Native(native) => {
                if !native.arity.accepts(args.len()) {
                    return Err(arity_error(&native.arity.to_string(), args.len(), span));
                }
                tracing::trace!(name = native.name, args = args.len(), "native call");
                (native.func)(self, &args).map_err(|error| error.with_span_if_absent(span))
            }
            Value::Closure(closure) => {
                if closure.arity() != args.len() {
                    return Err(arity_error(&closure.arity().to_string(), args.len(), span));
                }
                if self.call_stack.len() >= self.config.max_call_depth {
                    return Err(FlexError::runtime(span, "Maximum call depth exceeded")
                        .with_help(format!(
                            "Calls may nest at most {} deep; check for unbounded recursion.",
                            self.config.max_call_depth
                        )));
                }

                let declaration = Rc::clone(&closure.declaration);
                let frame = Environment::new_child(&closure.env);
                {
                    let mut frame = frame.borrow_mut();
                    for (param, arg) in declaration.params.iter().zip(args) {
                        frame.define(param.clone(), arg);
                    }
                }

                self.call_stack.push(CallFrame {
                    name: declaration.name.clone(),
                    line: span.line,
                });
                let result = self.execute_block(&declaration.body, frame);
                self.call_stack.pop();

                match result? {
                    Flow::Return(value) => Ok(value),
                    Flow::Normal => Ok(Value::Null),
                }
            }
            other => Err(FlexError::runtime(span, "Can only call functions.").with_help(format!(
                "A value of type {} is not callable.",
                other.type_name()
            ))),
        }
    }

    fn assign_variable(&mut self, name: &str, value: Value, span: &Span) -> Result<(), FlexError> {
        let defined = self.environment.borrow().is_defined(name);
        if defined {
            return self
                .environment
                .borrow_mut()
                .assign(name, value)
                .map_err(|error| error.with_span_if_absent(*span));
        }

        match self.config.undeclared_assignment {
            AssignScope::CurrentFrame => self.environment.borrow_mut().define(name, value),
            AssignScope::Global => self.globals.borrow_mut().define(name, value),
        }
        Ok(())
    }

    fn get_property(&self, object: &Value, name: &str, span: &Span) -> Result<Value, FlexError> {
        match (object, name) {
            (Value::Null, _) => Err(FlexError::runtime(
                *span,
                format!("Cannot read property '{}' of null.", name),
            )),
            (Value::Array(items), "length") => Ok(Value::Number(items.borrow().len() as f64)),
            (Value::String(s), "length") => Ok(Value::Number(s.chars().count() as f64)),
            _ => Err(FlexError::runtime(*span, format!("Undefined property '{}'.", name))
                .with_help("Only arrays and strings have a 'length' property.")),
        }
    }

    fn get_index(&self, object: &Value, index: &Value, span: &Span) -> Result<Value, FlexError> {
        match object {
            Value::Array(items) => {
                let items = items.borrow();
                let i = array_index(index, span)?;
                items.get(i).cloned().ok_or_else(|| out_of_bounds(index, span))
            }
            Value::String(s) => {
                let i = array_index(index, span)?;
                s.chars()
                    .nth(i)
                    .map(|c| Value::String(c.to_string()))
                    .ok_or_else(|| out_of_bounds(index, span))
            }
            Value::Null => Err(FlexError::runtime(*span, "Cannot read property of null.")),
            other => Err(FlexError::runtime(
                *span,
                format!("Cannot index a value of type {}.", other.type_name()),
            )),
        }
    }

    /// Writing past the end grows the array, padding the gap with null.
    fn set_index(&self, object: &Value, index: &Value, value: Value, span: &Span) -> Result<(), FlexError> {
        let Value::Array(items) = object else {
            return Err(FlexError::runtime(
                *span,
                format!("Cannot set an index on value of type {}.", object.type_name()),
            ));
        };

        let i = array_index(index, span)?;
        if i > MAX_ARRAY_INDEX {
            return Err(FlexError::runtime(*span, format!("Array index too large: {}", i)));
        }

        let mut items = items.borrow_mut();
        if i >= items.len() {
            items.resize(i + 1, Value::Null);
        }
        items[i] = value;
        Ok(())
    }

    fn evaluate_binary_op(
        &self,
        operator: BinaryOp,
        left: Value,
        right: Value,
        span: &Span,
    ) -> Result<Value, FlexError> {
        match operator {
            BinaryOp::Add => match (left, right) {
                (Value::Number(l), Value::Number(r)) => Ok(Value::Number(l + r)),
                (l @ Value::String(_), r) | (l, r @ Value::String(_)) => {
                    Ok(Value::String(format!("{}{}", l, r)))
                }
                (l, r) => Err(FlexError::runtime(*span, "Operands must be numbers or strings.")
                    .with_help(format!("Cannot add {} and {}.", l.type_name(), r.type_name()))),
            },
            BinaryOp::Subtract => {
                let (l, r) = number_operands(&left, &right, span)?;
                Ok(Value::Number(l - r))
            }
            BinaryOp::Multiply => {
                let (l, r) = number_operands(&left, &right, span)?;
                Ok(Value::Number(l * r))
            }
            BinaryOp::Divide => {
                let (l, r) = number_operands(&left, &right, span)?;
                if r == 0.0 {
                    Err(FlexError::runtime(*span, "Division by zero"))
                } else {
                    Ok(Value::Number(l / r))
                }
            }
            BinaryOp::Equal => Ok(Value::Bool(left == right)),
            BinaryOp::NotEqual => Ok(Value::Bool(left != right)),
            BinaryOp::Greater => {
                let (l, r) = number_operands(&left, &right, span)?;
                Ok(Value::Bool(l > r))
            }
            BinaryOp::GreaterEqual => {
                let (l, r) = number_operands(&left, &right, span)?;
                Ok(Value::Bool(l >= r))
            }
            BinaryOp::Less => {
                let (l, r) = number_operands(&left, &right, span)?;
                Ok(Value::Bool(l < r))
            }
            BinaryOp::LessEqual => {
                let (l, r) = number_operands(&left, &right, span)?;
                Ok(Value::Bool(l <= r))
            }
        }
    }

    /// Blocks on the console for one line. Cancellation and a pending stop
    /// both abort the run.
    pub fn read_input(&mut self, prompt: &str) -> Result<String, FlexError> {
        if self.is_stopped() {
            return Err(FlexError::halted());
        }
        match self.console.request_input(prompt) {
            InputReply::Line(line) => Ok(line),
            InputReply::Cancelled if self.is_stopped() => Err(FlexError::halted()),
            InputReply::Cancelled => Err(FlexError::input_cancelled()),
        }
    }

    fn notify_hook(&mut self, line: usize) -> Result<(), FlexError> {
        if let Some(mut hook) = self.hook.take() {
            let result = hook.before_statement(self, line);
            self.hook = Some(hook);
            result?;
        }
        Ok(())
    }

    fn at_top_level(&self) -> bool {
        self.call_stack.is_empty() && Rc::ptr_eq(&self.environment, &self.globals)
    }

    pub fn console(&mut self) -> &mut dyn Console {
        self.console.as_mut()
    }

    pub fn rng(&mut self) -> &mut StdRng {
        &mut self.rng
    }

    pub fn config(&self) -> &InterpreterConfig {
        &self.config
    }

    pub fn globals(&self) -> &EnvRef {
        &self.globals
    }

    /// Bindings of the innermost frame, without the untouched natives and
    /// constants of the global frame.
    pub fn bindings(&self) -> Vec<(String, Value)> {
        self.environment
            .borrow()
            .bindings()
            .into_iter()
            .filter(|(name, value)| !self.is_pristine_builtin(name, value))
            .collect()
    }

    fn is_pristine_builtin(&self, name: &str, value: &Value) -> bool {
        match self.registry.get(name) {
            Some(Binding::Native(native)) => {
                matches!(value, Value::Native(current) if current.name == native.name)
            }
            Some(Binding::Number(n)) => *value == Value::Number(n),
            None => false,
        }
    }

    pub fn call_stack(&self) -> &[CallFrame] {
        &self.call_stack
    }

    pub fn call_depth(&self) -> usize {
        self.call_stack.len()
    }

    /// Index of the top-level statement currently executing.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn set_hook(&mut self, hook: Box<dyn StatementHook>) {
        self.hook = Some(hook);
    }

    pub fn clear_hook(&mut self) -> Option<Box<dyn StatementHook>> {
        self.hook.take()
    }

    pub fn is_stopped(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }

    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    /// Shares `flag` as this evaluator's stop flag, so a handle created
    /// before the evaluator existed can still stop it.
    pub fn use_stop_flag(&mut self, flag: Arc<AtomicBool>) {
        self.stop = flag;
    }
}

impl Drop for Evaluator {
    // Closures stored in the global frame point back at it.
    fn drop(&mut self) {
        if let Ok(mut globals) = self.globals.try_borrow_mut() {
            globals.clear();
        }
    }
}

fn number_operands(left: &Value, right: &Value, span: &Span) -> Result<(f64, f64), FlexError> {
    match (left, right) {
        (Value::Number(l), Value::Number(r)) => Ok((*l, *r)),
        (l, r) => Err(FlexError::runtime(*span, "Operands must be numbers.").with_help(format!(
            "Got {} and {}.",
            l.type_name(),
            r.type_name()
        ))),
    }
}

fn array_index(index: &Value, span: &Span) -> Result<usize, FlexError> {
    match index {
        Value::Number(n) if *n < 0.0 => Err(out_of_bounds(index, span)),
        Value::Number(n) if n.fract() == 0.0 => Ok(*n as usize),
        Value::Number(n) => Err(FlexError::runtime(
            *span,
            format!("Invalid array index: {}", format_number(*n)),
        )),
        other => Err(FlexError::runtime(
            *span,
            format!("Array index must be a number, got {}.", other.type_name()),
        )),
    }
}

fn out_of_bounds(index: &Value, span: &Span) -> FlexError {
    FlexError::runtime(*span, format!("Array index out of bounds: {}", index))
}

fn arity_error(expected: &str, got: usize, span: Span) -> FlexError {
    FlexError::runtime(
        span,
        format!("Expected {} arguments but got {}.", expected, got),
    )
}
