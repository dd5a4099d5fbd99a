use std::cell::RefCell;
use std::collections::HashMap;
use std::io::Write;
use std::rc::Rc;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::environment::Environment;
use crate::error::{LoxError, Result};
use crate::expr::Expr;
use crate::stmt::Stmt;
use crate::token::{Token, TokenType};
use crate::value::{LoxClass, LoxFunction, LoxInstance, Value};

/// Out-of-band control transfer threaded through `execute`/`eval`.
///
/// `Return` is caught only at the nearest function call boundary
/// (`LoxFunction::call`); `Error` propagates all the way out. Anything else
/// escaping a call boundary is an interpreter bug.
pub enum Unwind {
    Return(Value),
    Error(LoxError),
}

impl From<LoxError> for Unwind {
    fn from(e: LoxError) -> Self {
        Unwind::Error(e)
    }
}

/// Tree-walking evaluator.
///
/// Generic over the `print` sink so tests can capture output; `main` passes
/// stdout. Owns the global frame, a cursor to the current frame, and the
/// resolver's side table of lexical depths keyed by node id.
pub struct Interpreter<W: Write> {
    globals: Rc<RefCell<Environment>>,
    environment: Rc<RefCell<Environment>>,
    locals: HashMap<usize, usize>,
    output: W,
    had_runtime_error: bool,
}

impl<W: Write> Interpreter<W> {
    pub fn new(output: W) -> Self {
        let globals = Rc::new(RefCell::new(Environment::new()));

        globals.borrow_mut().define(
            "clock",
            Value::NativeFunction {
                name: "clock",
                arity: 0,
                func: clock_native,
            },
        );

        Interpreter {
            environment: Rc::clone(&globals),
            globals,
            locals: HashMap::new(),
            output,
            had_runtime_error: false,
        }
    }

    /// Resolver callback: this occurrence of a variable lives `depth` frames
    /// up from wherever the current frame is at evaluation time.
    pub fn resolve(&mut self, id: usize, depth: usize) {
        self.locals.insert(id, depth);
    }

    pub fn had_runtime_error(&self) -> bool {
        self.had_runtime_error
    }

    /// Run-mode entry: execute statements until the first runtime error,
    /// which is reported to stderr and latched in the error flag.
    pub fn interpret(&mut self, statements: &[Stmt]) {
        for statement in statements {
            match self.execute(statement) {
                Ok(()) => {}

                Err(Unwind::Error(e)) => {
                    eprintln!("{}", e);
                    self.had_runtime_error = true;
                    return;
                }

                // The resolver rejects top-level `return`; nothing to do but
                // stop if one ever gets here.
                Err(Unwind::Return(_)) => return,
            }
        }
    }

    /// Evaluate-mode entry for a single expression.
    pub fn evaluate(&mut self, expr: &Expr) -> Result<Value> {
        match self.eval(expr) {
            Ok(value) | Err(Unwind::Return(value)) => Ok(value),
            Err(Unwind::Error(e)) => Err(e),
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Statements
    // ─────────────────────────────────────────────────────────────────────

    fn execute(&mut self, stmt: &Stmt) -> std::result::Result<(), Unwind> {
        match stmt {
            Stmt::Expression(expr) => {
                self.eval(expr)?;

                Ok(())
            }

            Stmt::Print(expr) => {
                let value = self.eval(expr)?;

                writeln!(self.output, "{}", value).map_err(LoxError::from)?;

                Ok(())
            }

            Stmt::Var { name, initializer } => {
                let value: Value = match initializer {
                    Some(expr) => self.eval(expr)?,
                    None => Value::Nil,
                };

                self.environment.borrow_mut().define(&name.lexeme, value);

                Ok(())
            }

            Stmt::Block(statements) => {
                let environment = Rc::new(RefCell::new(Environment::with_enclosing(Rc::clone(
                    &self.environment,
                ))));

                self.execute_block(statements, environment)
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if is_truthy(&self.eval(condition)?) {
                    self.execute(then_branch)?;
                } else if let Some(else_branch) = else_branch {
                    self.execute(else_branch)?;
                }

                Ok(())
            }

            Stmt::While { condition, body } => {
                while is_truthy(&self.eval(condition)?) {
                    self.execute(body)?;
                }

                Ok(())
            }

            Stmt::Function(declaration) => {
                let function = LoxFunction::new(
                    Rc::clone(declaration),
                    Rc::clone(&self.environment),
                    false,
                );

                self.environment
                    .borrow_mut()
                    .define(&declaration.name.lexeme, Value::Function(Rc::new(function)));

                Ok(())
            }

            Stmt::Return { value, .. } => {
                let value: Value = match value {
                    Some(expr) => self.eval(expr)?,
                    None => Value::Nil,
                };

                Err(Unwind::Return(value))
            }

            Stmt::Class { name, methods } => {
                // Two-step definition so methods resolved against the class
                // body can see the name before the object exists.
                self.environment
                    .borrow_mut()
                    .define(&name.lexeme, Value::Nil);

                let mut method_map: HashMap<String, Rc<LoxFunction>> = HashMap::new();
                for declaration in methods {
                    let function = LoxFunction::new(
                        Rc::clone(declaration),
                        Rc::clone(&self.environment),
                        declaration.name.lexeme == "init",
                    );

                    method_map.insert(declaration.name.lexeme.clone(), Rc::new(function));
                }

                let class = Value::Class(Rc::new(LoxClass::new(name.lexeme.clone(), method_map)));

                self.environment.borrow_mut().assign(name, class)?;

                Ok(())
            }
        }
    }

    /// Execute statements in the given frame, restoring the previous frame
    /// on every exit path.
    pub fn execute_block(
        &mut self,
        statements: &[Stmt],
        environment: Rc<RefCell<Environment>>,
    ) -> std::result::Result<(), Unwind> {
        let previous = Rc::clone(&self.environment);
        self.environment = environment;

        let mut result = Ok(());
        for statement in statements {
            result = self.execute(statement);
            if result.is_err() {
                break;
            }
        }

        self.environment = previous;

        result
    }

    // ─────────────────────────────────────────────────────────────────────
    // Expressions
    // ─────────────────────────────────────────────────────────────────────

    fn eval(&mut self, expr: &Expr) -> std::result::Result<Value, Unwind> {
        match expr {
            Expr::Literal(token) => Ok(literal_value(token)),

            Expr::Grouping(inner) => self.eval(inner),

            Expr::Unary { operator, right } => self.eval_unary(operator, right),

            Expr::Binary {
                left,
                operator,
                right,
            } => self.eval_binary(left, operator, right),

            Expr::Logical {
                left,
                operator,
                right,
            } => {
                let left_val = self.eval(left)?;

                // Short-circuit yields the operand itself, not a boolean.
                if operator.token_type == TokenType::OR {
                    if is_truthy(&left_val) {
                        return Ok(left_val);
                    }
                } else if !is_truthy(&left_val) {
                    return Ok(left_val);
                }

                self.eval(right)
            }

            Expr::Variable { id, name } => self.look_up_variable(*id, name),

            Expr::Assign { id, name, value } => {
                let value = self.eval(value)?;

                match self.locals.get(id) {
                    Some(&distance) => {
                        if !Environment::assign_at(
                            &self.environment,
                            distance,
                            &name.lexeme,
                            value.clone(),
                        ) {
                            return Err(LoxError::runtime(
                                name.line,
                                format!("Undefined variable '{}'.", name.lexeme),
                            )
                            .into());
                        }
                    }

                    None => {
                        self.globals.borrow_mut().assign(name, value.clone())?;
                    }
                }

                Ok(value)
            }

            Expr::Call {
                callee,
                paren,
                arguments,
            } => self.eval_call(callee, paren, arguments),

            Expr::Get { object, name } => match self.eval(object)? {
                Value::Instance(instance) => {
                    LoxInstance::get(&instance, &name.lexeme).ok_or_else(|| {
                        LoxError::runtime(
                            name.line,
                            format!("Undefined property '{}'.", name.lexeme),
                        )
                        .into()
                    })
                }

                _ => Err(LoxError::runtime(name.line, "Only instances have properties.").into()),
            },

            Expr::Set {
                object,
                name,
                value,
            } => match self.eval(object)? {
                Value::Instance(instance) => {
                    let value = self.eval(value)?;

                    instance.borrow_mut().set(&name.lexeme, value.clone());

                    Ok(value)
                }

                _ => Err(LoxError::runtime(name.line, "Only instances have fields.").into()),
            },

            Expr::This { id, keyword } => self.look_up_variable(*id, keyword),
        }
    }

    fn look_up_variable(&self, id: usize, name: &Token) -> std::result::Result<Value, Unwind> {
        match self.locals.get(&id) {
            Some(&distance) => Environment::get_at(&self.environment, distance, &name.lexeme)
                .ok_or_else(|| {
                    LoxError::runtime(
                        name.line,
                        format!("Undefined variable '{}'.", name.lexeme),
                    )
                    .into()
                }),

            None => Ok(self.globals.borrow().get(name)?),
        }
    }

    fn eval_unary(
        &mut self,
        operator: &Token,
        right: &Expr,
    ) -> std::result::Result<Value, Unwind> {
        let value = self.eval(right)?;

        match operator.token_type {
            TokenType::MINUS => match value {
                Value::Number(n) => Ok(Value::Number(-n)),

                _ => Err(LoxError::runtime(operator.line, "Operand must be a number.").into()),
            },

            TokenType::BANG => Ok(Value::Bool(!is_truthy(&value))),

            _ => Err(LoxError::runtime(operator.line, "Invalid unary operator.").into()),
        }
    }

    fn eval_binary(
        &mut self,
        left: &Expr,
        operator: &Token,
        right: &Expr,
    ) -> std::result::Result<Value, Unwind> {
        let left_val = self.eval(left)?;
        let right_val = self.eval(right)?;

        match operator.token_type {
            TokenType::PLUS => match (left_val, right_val) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),

                (Value::String(a), Value::String(b)) => Ok(Value::String(a + &b)),

                _ => Err(LoxError::runtime(
                    operator.line,
                    "Operands must be two numbers or two strings.",
                )
                .into()),
            },

            TokenType::MINUS => match (left_val, right_val) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a - b)),

                _ => Err(numbers_error(operator)),
            },

            TokenType::STAR => match (left_val, right_val) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a * b)),

                _ => Err(numbers_error(operator)),
            },

            // Division by zero follows IEEE-754: ±inf, or NaN for 0/0.
            TokenType::SLASH => match (left_val, right_val) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a / b)),

                _ => Err(numbers_error(operator)),
            },

            TokenType::GREATER => match (left_val, right_val) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Bool(a > b)),

                _ => Err(numbers_error(operator)),
            },

            TokenType::GREATER_EQUAL => match (left_val, right_val) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Bool(a >= b)),

                _ => Err(numbers_error(operator)),
            },

            TokenType::LESS => match (left_val, right_val) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Bool(a < b)),

                _ => Err(numbers_error(operator)),
            },

            TokenType::LESS_EQUAL => match (left_val, right_val) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Bool(a <= b)),

                _ => Err(numbers_error(operator)),
            },

            TokenType::EQUAL_EQUAL => Ok(Value::Bool(left_val == right_val)),

            TokenType::BANG_EQUAL => Ok(Value::Bool(left_val != right_val)),

            _ => Err(LoxError::runtime(operator.line, "Invalid binary operator.").into()),
        }
    }

    fn eval_call(
        &mut self,
        callee: &Expr,
        paren: &Token,
        arguments: &[Expr],
    ) -> std::result::Result<Value, Unwind> {
        let callee_val = self.eval(callee)?;

        let mut args: Vec<Value> = Vec::with_capacity(arguments.len());
        for argument in arguments {
            args.push(self.eval(argument)?);
        }

        match callee_val {
            Value::NativeFunction { arity, func, .. } => {
                self.check_arity(arity, args.len(), paren)?;

                Ok(func(&args)?)
            }

            Value::Function(function) => {
                self.check_arity(function.arity(), args.len(), paren)?;

                function.call(self, args)
            }

            Value::Class(class) => {
                self.check_arity(class.arity(), args.len(), paren)?;

                LoxClass::instantiate(&class, self, args)
            }

            _ => Err(LoxError::runtime(paren.line, "Can only call functions and classes.").into()),
        }
    }

    fn check_arity(
        &self,
        expected: usize,
        got: usize,
        paren: &Token,
    ) -> std::result::Result<(), Unwind> {
        if expected != got {
            return Err(LoxError::runtime(
                paren.line,
                format!("Expected {} arguments but got {}.", expected, got),
            )
            .into());
        }

        Ok(())
    }
}

fn literal_value(token: &Token) -> Value {
    match &token.token_type {
        TokenType::NUMBER(n) => Value::Number(*n),

        TokenType::STRING(s) => Value::String(s.clone()),

        TokenType::TRUE => Value::Bool(true),

        TokenType::FALSE => Value::Bool(false),

        _ => Value::Nil,
    }
}

fn numbers_error(operator: &Token) -> Unwind {
    LoxError::runtime(operator.line, "Operands must be numbers.").into()
}

/// `nil` and `false` are falsy; everything else is truthy.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Nil => false,

        Value::Bool(b) => *b,

        _ => true,
    }
}

fn clock_native(_args: &[Value]) -> Result<Value> {
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0);

    Ok(Value::Number(timestamp))
}
