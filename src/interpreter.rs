use std::cell::RefCell;
use std::collections::HashMap;
use std::io::{self, Stdout, Write};
use std::rc::Rc;
use std::time::{SystemTime, SystemTimeError, UNIX_EPOCH};

use log::{debug, info};

use crate::environment::{EnvRef, Environment};
use crate::error::{LoxError, Result};
use crate::expr::{Expr, ExprId, LiteralValue};
use crate::object::{LoxClass, LoxFunction, LoxInstance};
use crate::stmt::{FunctionDecl, Stmt};
use crate::token::{Token, TokenType};
use crate::value::Value;

/// Deepest nesting of Lox calls before a runtime error is raised.
pub const MAX_CALL_DEPTH: usize = 1024;

/// How a statement finished.  `return` unwinds as a value threaded back
/// through every enclosing statement until a call boundary consumes it.
#[derive(Debug)]
pub enum Flow<'a> {
    Normal,
    Return(Value<'a>),
}

/// Tree-walking evaluator.
///
/// Holds the global frame, the resolver's hop-count table and the sink that
/// `print` writes to.  The current environment is passed explicitly to every
/// `execute`/`evaluate` call.
pub struct Interpreter<'a, W: Write = Stdout> {
    globals: EnvRef<'a>,
    locals: HashMap<ExprId, usize>,
    /// Number of Lox calls currently on the stack.
    depth: usize,
    out: W,
}

impl<'a> Interpreter<'a> {
    /// Creates an interpreter printing to stdout.
    pub fn new() -> Self {
        Self::with_output(io::stdout())
    }
}

impl Default for Interpreter<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, W: Write> Interpreter<'a, W> {
    /// Creates an Interpreter writing `print` output to `out` and defines
    /// native functions such as `clock`.
    pub fn with_output(out: W) -> Self {
        info!("Initializing Interpreter");

        let globals: EnvRef<'a> = Rc::new(RefCell::new(Environment::new()));

        debug!("Defining native function 'clock'");

        globals.borrow_mut().define(
            "clock",
            Value::NativeFunction {
                name: "clock",
                arity: 0,
                func: clock,
            },
        );

        Self {
            globals,
            locals: HashMap::new(),
            depth: 0,
            out,
        }
    }

    /// Called by the resolver: `id` lives `depth` frames out from where it is used.
    pub fn note_local(&mut self, id: ExprId, depth: usize) {
        debug!("Noting {:?} at depth {}", id, depth);
        self.locals.insert(id, depth);
    }

    /// The hop count recorded for `id`, or `None` for a global.
    pub fn resolved_depth(&self, id: ExprId) -> Option<usize> {
        self.locals.get(&id).copied()
    }

    /// Interprets a list of statements (a "program") in the global frame.
    /// Stops at the first runtime error; output already written stays written.
    pub fn interpret(&mut self, statements: &[Stmt<'a>]) -> Result<()> {
        info!("Interpreting {} statements", statements.len());

        let globals = Rc::clone(&self.globals);
        let result = statements
            .iter()
            .try_for_each(|stmt| self.execute(stmt, &globals).map(|_| ()));

        self.out.flush()?;

        if result.is_ok() {
            info!("Interpretation completed successfully");
        }
        result
    }

    /// Evaluates a standalone expression against the global frame.
    pub fn evaluate_expression(&mut self, expr: &Expr<'a>) -> Result<Value<'a>> {
        let globals = Rc::clone(&self.globals);
        self.evaluate(expr, &globals)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Statements
    // ─────────────────────────────────────────────────────────────────────────

    /// Executes a single statement in `env`.
    pub fn execute(&mut self, stmt: &Stmt<'a>, env: &EnvRef<'a>) -> Result<Flow<'a>> {
        match stmt {
            Stmt::Expression(expr) => {
                self.evaluate(expr, env)?;
                Ok(Flow::Normal)
            }

            Stmt::Print(expr) => {
                let value = self.evaluate(expr, env)?;
                writeln!(self.out, "{}", value)?;
                debug!("Printed value: {}", value);
                Ok(Flow::Normal)
            }

            Stmt::Var { name, initializer } => {
                let value = match initializer {
                    Some(expr) => self.evaluate(expr, env)?,
                    None => Value::Nil,
                };
                debug!("Defining variable '{}' = {}", name.lexeme, value);
                env.borrow_mut().define(name.lexeme, value);
                Ok(Flow::Normal)
            }

            Stmt::Block(statements) => {
                self.execute_block(statements, Environment::child_of(env))
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.evaluate(condition, env)?.is_truthy() {
                    self.execute(then_branch, env)
                } else if let Some(else_stmt) = else_branch {
                    self.execute(else_stmt, env)
                } else {
                    Ok(Flow::Normal)
                }
            }

            Stmt::While { condition, body } => {
                while self.evaluate(condition, env)?.is_truthy() {
                    if let Flow::Return(value) = self.execute(body, env)? {
                        return Ok(Flow::Return(value));
                    }
                }
                Ok(Flow::Normal)
            }

            Stmt::Function(declaration) => {
                debug!("Defining function '{}'", declaration.name.lexeme);
                // Capture the current environment as the closure.
                let function = LoxFunction::new(Rc::clone(declaration), Rc::clone(env), false);
                env.borrow_mut()
                    .define(declaration.name.lexeme, Value::Function(Rc::new(function)));
                Ok(Flow::Normal)
            }

            Stmt::Return { value, .. } => {
                let value = match value {
                    Some(expr) => self.evaluate(expr, env)?,
                    None => Value::Nil,
                };
                debug!("Returning value: {}", value);
                Ok(Flow::Return(value))
            }

            Stmt::Class {
                name,
                superclass,
                methods,
            } => {
                self.execute_class(name, superclass.as_ref(), methods, env)?;
                Ok(Flow::Normal)
            }
        }
    }

    /// Runs `statements` in `env`, stopping early on `return`.
    pub fn execute_block(&mut self, statements: &[Stmt<'a>], env: EnvRef<'a>) -> Result<Flow<'a>> {
        for stmt in statements {
            match self.execute(stmt, &env)? {
                Flow::Normal => {}
                flow => return Ok(flow),
            }
        }
        Ok(Flow::Normal)
    }

    fn execute_class(
        &mut self,
        name: &Token<'a>,
        superclass: Option<&Expr<'a>>,
        methods: &[Rc<FunctionDecl<'a>>],
        env: &EnvRef<'a>,
    ) -> Result<()> {
        debug!("Defining class '{}'", name.lexeme);

        let superclass = match superclass {
            Some(expr) => match self.evaluate(expr, env)? {
                Value::Class(class) => Some(class),
                _ => {
                    let line = match expr {
                        Expr::Variable { name, .. } => name.line,
                        _ => name.line,
                    };
                    return Err(LoxError::runtime(line, "Superclass must be a class."));
                }
            },
            None => None,
        };

        env.borrow_mut().define(name.lexeme, Value::Nil);

        // Methods of a subclass close over a frame binding `super`.
        let method_env = match &superclass {
            Some(class) => {
                let frame = Environment::child_of(env);
                frame
                    .borrow_mut()
                    .define("super", Value::Class(Rc::clone(class)));
                frame
            }
            None => Rc::clone(env),
        };

        let methods: HashMap<String, Rc<LoxFunction<'a>>> = methods
            .iter()
            .map(|decl| {
                let is_initializer = decl.name.lexeme == "init";
                let function =
                    LoxFunction::new(Rc::clone(decl), Rc::clone(&method_env), is_initializer);
                (decl.name.lexeme.to_string(), Rc::new(function))
            })
            .collect();

        let class = LoxClass::new(name.lexeme, superclass, methods);
        env.borrow_mut().assign(name, Value::Class(Rc::new(class)))?;

        info!("Class '{}' defined", name.lexeme);
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Expressions
    // ─────────────────────────────────────────────────────────────────────────

    /// Evaluates an expression in `env` and returns a Value.
    pub fn evaluate(&mut self, expr: &Expr<'a>, env: &EnvRef<'a>) -> Result<Value<'a>> {
        match expr {
            Expr::Literal(literal) => Ok(literal_value(literal)),

            Expr::Grouping(inner) => self.evaluate(inner, env),

            Expr::Unary { operator, right } => self.evaluate_unary(operator, right, env),

            Expr::Binary {
                left,
                operator,
                right,
            } => self.evaluate_binary(left, operator, right, env),

            Expr::Logical {
                left,
                operator,
                right,
            } => {
                let left_val = self.evaluate(left, env)?;
                let short_circuits = if operator.token_type == TokenType::OR {
                    left_val.is_truthy()
                } else {
                    !left_val.is_truthy()
                };

                if short_circuits {
                    Ok(left_val)
                } else {
                    self.evaluate(right, env)
                }
            }

            Expr::Variable { id, name } => self.look_up_variable(*id, name, env),

            Expr::Assign { id, name, value } => {
                let value = self.evaluate(value, env)?;
                match self.resolved_depth(*id) {
                    Some(distance) => Environment::assign_at(env, distance, name, value.clone())?,
                    None => self.globals.borrow_mut().assign(name, value.clone())?,
                }
                debug!("Assigned {} to '{}'", value, name.lexeme);
                Ok(value)
            }

            Expr::Call {
                callee,
                paren,
                arguments,
            } => {
                let callee_val = self.evaluate(callee, env)?;
                let mut arg_values = Vec::with_capacity(arguments.len());
                for arg in arguments {
                    arg_values.push(self.evaluate(arg, env)?);
                }
                self.invoke_callable(&callee_val, paren, arg_values)
            }

            Expr::Get { object, name } => match self.evaluate(object, env)? {
                Value::Instance(instance) => LoxInstance::get(&instance, name),
                _ => Err(LoxError::runtime(
                    name.line,
                    "Only instances have properties.",
                )),
            },

            Expr::Set {
                object,
                name,
                value,
            } => {
                let Value::Instance(instance) = self.evaluate(object, env)? else {
                    return Err(LoxError::runtime(name.line, "Only instances have fields."));
                };
                let value = self.evaluate(value, env)?;
                instance.borrow_mut().set(name, value.clone());
                Ok(value)
            }

            Expr::This { id, keyword } => self.look_up_variable(*id, keyword, env),

            Expr::Super {
                id,
                keyword,
                method,
            } => self.evaluate_super(*id, keyword, method, env),
        }
    }

    fn evaluate_unary(
        &mut self,
        op: &Token<'a>,
        expr: &Expr<'a>,
        env: &EnvRef<'a>,
    ) -> Result<Value<'a>> {
        let right_val = self.evaluate(expr, env)?;
        match op.token_type {
            TokenType::MINUS => match right_val {
                Value::Number(n) => Ok(Value::Number(-n)),
                _ => Err(LoxError::runtime(op.line, "Operand must be a number.")),
            },
            TokenType::BANG => Ok(Value::Bool(!right_val.is_truthy())),
            _ => Err(LoxError::runtime(
                op.line,
                format!("Invalid unary operator '{}'.", op.lexeme),
            )),
        }
    }

    /// Both operands are evaluated left to right before the operator is checked.
    fn evaluate_binary(
        &mut self,
        left: &Expr<'a>,
        op: &Token<'a>,
        right: &Expr<'a>,
        env: &EnvRef<'a>,
    ) -> Result<Value<'a>> {
        let left_val = self.evaluate(left, env)?;
        let right_val = self.evaluate(right, env)?;
        debug!("Binary '{}' on {:?} and {:?}", op.lexeme, left_val, right_val);

        match op.token_type {
            TokenType::PLUS => match (left_val, right_val) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
                (Value::String(a), Value::String(b)) => Ok(Value::String(a + &b)),
                _ => Err(LoxError::runtime(
                    op.line,
                    "Operands must be two numbers or two strings.",
                )),
            },
            TokenType::MINUS => {
                let (a, b) = number_operands(op, &left_val, &right_val)?;
                Ok(Value::Number(a - b))
            }
            TokenType::STAR => {
                let (a, b) = number_operands(op, &left_val, &right_val)?;
                Ok(Value::Number(a * b))
            }
            // IEEE-754: x / 0 is ±inf or NaN.
            TokenType::SLASH => {
                let (a, b) = number_operands(op, &left_val, &right_val)?;
                Ok(Value::Number(a / b))
            }
            TokenType::GREATER => {
                let (a, b) = number_operands(op, &left_val, &right_val)?;
                Ok(Value::Bool(a > b))
            }
            TokenType::GREATER_EQUAL => {
                let (a, b) = number_operands(op, &left_val, &right_val)?;
                Ok(Value::Bool(a >= b))
            }
            TokenType::LESS => {
                let (a, b) = number_operands(op, &left_val, &right_val)?;
                Ok(Value::Bool(a < b))
            }
            TokenType::LESS_EQUAL => {
                let (a, b) = number_operands(op, &left_val, &right_val)?;
                Ok(Value::Bool(a <= b))
            }
            TokenType::EQUAL_EQUAL => Ok(Value::Bool(left_val == right_val)),
            TokenType::BANG_EQUAL => Ok(Value::Bool(left_val != right_val)),
            _ => Err(LoxError::runtime(
                op.line,
                format!("Invalid binary operator '{}'.", op.lexeme),
            )),
        }
    }

    /// Resolved names jump straight to their frame; the rest are globals.
    fn look_up_variable(
        &self,
        id: ExprId,
        name: &Token<'_>,
        env: &EnvRef<'a>,
    ) -> Result<Value<'a>> {
        match self.resolved_depth(id) {
            Some(distance) => Environment::get_at(env, distance, name),
            None => self.globals.borrow().get(name),
        }
    }

    /// `super.method` binds the superclass method to the current `this`.
    /// The superclass comes from the frame the defining class created, so
    /// dispatch does not depend on the runtime class of `this`.
    fn evaluate_super(
        &mut self,
        id: ExprId,
        keyword: &Token<'_>,
        method: &Token<'_>,
        env: &EnvRef<'a>,
    ) -> Result<Value<'a>> {
        let unresolved = || LoxError::runtime(keyword.line, "Can't use 'super' outside of a class.");

        let distance = self.resolved_depth(id).ok_or_else(unresolved)?;

        let Some(Value::Class(superclass)) = Environment::get_named_at(env, distance, "super")
        else {
            return Err(unresolved());
        };

        // `this` is bound one frame inside the `super` frame.
        let this_distance = distance.checked_sub(1).ok_or_else(unresolved)?;
        let Some(Value::Instance(object)) = Environment::get_named_at(env, this_distance, "this")
        else {
            return Err(unresolved());
        };

        let found = superclass.find_method(method.lexeme).ok_or_else(|| {
            LoxError::runtime(
                method.line,
                format!("Undefined property '{}'.", method.lexeme),
            )
        })?;

        Ok(Value::Function(Rc::new(found.bind(object))))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Calls
    // ─────────────────────────────────────────────────────────────────────────

    /// Invokes a callable (native, user-defined function, or class).
    fn invoke_callable(
        &mut self,
        callee_val: &Value<'a>,
        paren_token: &Token<'_>,
        arg_values: Vec<Value<'a>>,
    ) -> Result<Value<'a>> {
        match callee_val {
            Value::NativeFunction { name, arity, func } => {
                check_arity(paren_token, *arity, arg_values.len())?;
                debug!("Calling native function '{}'", name);
                func(&arg_values).map_err(|msg| LoxError::runtime(paren_token.line, msg))
            }

            Value::Function(function) => {
                check_arity(paren_token, function.arity(), arg_values.len())?;
                self.nested(paren_token, |interp| interp.call_function(function, arg_values))
            }

            Value::Class(class) => {
                check_arity(paren_token, class.arity(), arg_values.len())?;
                self.nested(paren_token, |interp| interp.instantiate(class, arg_values))
            }

            _ => Err(LoxError::runtime(
                paren_token.line,
                "Can only call functions and classes.",
            )),
        }
    }

    /// Runs `call` one level deeper, failing once `MAX_CALL_DEPTH` is reached.
    fn nested<T>(
        &mut self,
        paren_token: &Token<'_>,
        call: impl FnOnce(&mut Self) -> Result<T>,
    ) -> Result<T> {
        if self.depth >= MAX_CALL_DEPTH {
            debug!("Call depth limit {} reached", MAX_CALL_DEPTH);
            return Err(LoxError::runtime(paren_token.line, "Stack overflow."));
        }

        self.depth += 1;
        let result = call(self);
        self.depth -= 1;
        result
    }

    /// Runs a user function.  The new frame's parent is the function's
    /// closure, not the caller's environment.
    pub fn call_function(
        &mut self,
        function: &LoxFunction<'a>,
        arguments: Vec<Value<'a>>,
    ) -> Result<Value<'a>> {
        debug!("Calling user-defined function '{}'", function.name());

        let environment = Environment::child_of(function.closure());
        {
            let mut frame = environment.borrow_mut();
            for (param, arg) in function.declaration().params.iter().zip(arguments) {
                frame.define(param.lexeme, arg);
            }
        }

        let flow = self.execute_block(&function.declaration().body, environment)?;

        // An initializer always yields its instance, whatever it returned.
        if function.is_initializer() {
            return Environment::get_named_at(function.closure(), 0, "this").ok_or_else(|| {
                LoxError::runtime(
                    function.declaration().name.line,
                    "Initializer called without an instance.",
                )
            });
        }

        Ok(match flow {
            Flow::Return(value) => value,
            Flow::Normal => Value::Nil,
        })
    }

    /// Calling a class: a fresh instance, initialized by `init` when present.
    fn instantiate(
        &mut self,
        class: &Rc<LoxClass<'a>>,
        arguments: Vec<Value<'a>>,
    ) -> Result<Value<'a>> {
        debug!("Instantiating class '{}'", class.name());

        let instance = Rc::new(RefCell::new(LoxInstance::new(Rc::clone(class))));

        if let Some(initializer) = class.find_method("init") {
            let bound = initializer.bind(Rc::clone(&instance));
            self.call_function(&bound, arguments)?;
        }

        Ok(Value::Instance(instance))
    }
}

/// Seconds since the Unix epoch, as a number.
fn clock<'a>(_args: &[Value<'a>]) -> std::result::Result<Value<'a>, String> {
    let timestamp: f64 = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e: SystemTimeError| format!("Clock error: {}", e))?
        .as_secs_f64();
    Ok(Value::Number(timestamp))
}

fn literal_value<'a>(literal: &LiteralValue) -> Value<'a> {
    match literal {
        LiteralValue::Number(n) => Value::Number(*n),
        LiteralValue::Str(s) => Value::String(s.clone()),
        LiteralValue::True => Value::Bool(true),
        LiteralValue::False => Value::Bool(false),
        LiteralValue::Nil => Value::Nil,
    }
}

fn number_operands(op: &Token<'_>, left: &Value<'_>, right: &Value<'_>) -> Result<(f64, f64)> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => Ok((*a, *b)),
        _ => Err(LoxError::runtime(op.line, "Operands must be numbers.")),
    }
}

fn check_arity(paren: &Token<'_>, expected: usize, got: usize) -> Result<()> {
    if expected == got {
        return Ok(());
    }

    Err(LoxError::runtime(
        paren.line,
        format!("Expected {} arguments but got {}.", expected, got),
    ))
}
