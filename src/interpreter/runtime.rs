use std::cell::RefCell;
use std::collections::BTreeMap;
use std::io::{self, Write};
use std::rc::Rc;

use crate::builtins::NativeFunction;
use crate::lexer::Span;
use crate::parser::ast::{
    BinaryOperator, CallStep, DictEntry, DictKey, Expression, ExpressionList, IfBranch,
    UnaryOperator,
};

use super::error::RuntimeError;
use super::frame::Frame;
use super::value::{Function, Reference, Value, format_number};

/// Non-value outcomes of evaluation. `return`, `break`, and `continue`
/// travel on the error channel and are caught at call and loop boundaries;
/// anything that escapes its scope becomes a `RuntimeError` at the top.
#[derive(Debug)]
pub(super) enum Signal {
    Error(RuntimeError),
    Return(Span, Value),
    Break(Span),
    Continue(Span),
}

impl From<RuntimeError> for Signal {
    fn from(error: RuntimeError) -> Signal {
        Signal::Error(error)
    }
}

impl Signal {
    fn into_runtime_error(self) -> RuntimeError {
        match self {
            Signal::Error(error) => error,
            Signal::Return(span, _) => RuntimeError::StrayReturn {
                line: span.line,
                column: span.column,
            },
            Signal::Break(span) => RuntimeError::StrayBreak {
                line: span.line,
                column: span.column,
            },
            Signal::Continue(span) => RuntimeError::StrayContinue {
                line: span.line,
                column: span.column,
            },
        }
    }
}

pub(super) type EvalResult<T> = Result<T, Signal>;

/// Seeds the native runtime functions into a root frame.
pub(super) fn seed_native_globals(frame: &Frame) {
    for native in NativeFunction::ALL {
        frame.declare(native.name(), Value::Native(native));
    }
}

/// Recursive AST evaluator. Owns the sink that `log` writes through.
pub(super) struct Runtime<'out, W: Write> {
    output: &'out mut W,
}

impl<'out, W: Write> Runtime<'out, W> {
    pub(super) fn new(output: &'out mut W) -> Self {
        Self { output }
    }

    /// Threads `frame` through the top-level expressions and returns the
    /// value of the last one, or Nil for empty input.
    pub(super) fn eval_list(
        &mut self,
        program: &ExpressionList,
        frame: &Rc<Frame>,
    ) -> Result<Value, RuntimeError> {
        let mut result = Value::Nil;
        for expression in &program.expressions {
            result = self
                .eval_value(expression, frame)
                .map_err(Signal::into_runtime_error)?;
        }
        Ok(result)
    }

    /// Evaluates to a concrete value: identifiers resolve through the frame
    /// and references read their slot.
    fn eval_value(&mut self, expression: &Expression, frame: &Rc<Frame>) -> EvalResult<Value> {
        let value = self.eval_expression(expression, frame)?;
        Ok(unwrap_transient(value, frame)?)
    }

    fn eval_expression(&mut self, expression: &Expression, frame: &Rc<Frame>) -> EvalResult<Value> {
        match expression {
            Expression::Number(n) => Ok(Value::Number(*n)),
            Expression::Str(text) => Ok(Value::string(text.as_bytes())),
            Expression::Bool(b) => Ok(Value::Bool(*b)),
            Expression::Nil => Ok(Value::Nil),
            Expression::Identifier(name) => Ok(Value::Identifier(name.clone())),
            Expression::Unary { op, operand } => self.eval_unary(*op, operand, frame),
            Expression::Binary { left, op, right } => self.eval_binary(left, *op, right, frame),
            Expression::Assign { target, value } => self.eval_assign(target, value, frame),
            Expression::If {
                branches,
                else_body,
            } => self.eval_if(branches, else_body.as_deref(), frame),
            Expression::For {
                init,
                condition,
                post,
                body,
            } => self.eval_for(init, condition.as_deref(), post.as_deref(), body, frame),
            Expression::ForIn {
                key,
                binding,
                iterable,
                body,
            } => self.eval_for_in(key.as_deref(), binding, iterable, body, frame),
            Expression::FunctionLiteral { params, body } => {
                Ok(Value::Function(Rc::new(Function {
                    params: params.clone(),
                    body: body.clone(),
                    frame: Rc::clone(frame),
                })))
            }
            Expression::ListLiteral(elements) => {
                let mut values = Vec::with_capacity(elements.len());
                for element in elements {
                    values.push(self.eval_value(element, frame)?);
                }
                Ok(Value::list(values))
            }
            Expression::DictLiteral(entries) => self.eval_dict_literal(entries, frame),
            Expression::Call { callee, chain } => self.eval_call(callee, chain, frame),
            Expression::Return { value, span } => {
                let value = match value {
                    Some(expression) => self.eval_value(expression, frame)?,
                    None => Value::Nil,
                };
                Err(Signal::Return(*span, value))
            }
            Expression::Break { span } => Err(Signal::Break(*span)),
            Expression::Continue { span } => Err(Signal::Continue(*span)),
        }
    }

    fn eval_unary(
        &mut self,
        op: UnaryOperator,
        operand: &Expression,
        frame: &Rc<Frame>,
    ) -> EvalResult<Value> {
        let value = self.eval_value(operand, frame)?;
        match (op, value) {
            (UnaryOperator::Not, Value::Bool(b)) => Ok(Value::Bool(!b)),
            (UnaryOperator::Negate, Value::Number(n)) => Ok(Value::Number(-n)),
            (UnaryOperator::Not, other) => Err(RuntimeError::UnaryOperandType {
                op: "!",
                expected: "bool",
                found: other.type_name().to_string(),
            }
            .into()),
            (UnaryOperator::Negate, other) => Err(RuntimeError::UnaryOperandType {
                op: "-",
                expected: "number",
                found: other.type_name().to_string(),
            }
            .into()),
        }
    }

    fn eval_binary(
        &mut self,
        left: &Expression,
        op: BinaryOperator,
        right: &Expression,
        frame: &Rc<Frame>,
    ) -> EvalResult<Value> {
        if matches!(op, BinaryOperator::And | BinaryOperator::Or) {
            return self.eval_logic(left, op, right, frame);
        }

        let left = self.eval_value(left, frame)?;
        let right = self.eval_value(right, frame)?;
        match op {
            BinaryOperator::Equal => Ok(Value::Bool(left.equals(&right)?)),
            BinaryOperator::NotEqual => Ok(Value::Bool(!left.equals(&right)?)),
            BinaryOperator::Less
            | BinaryOperator::LessEqual
            | BinaryOperator::Greater
            | BinaryOperator::GreaterEqual => {
                let (Value::Number(a), Value::Number(b)) = (&left, &right) else {
                    return Err(RuntimeError::ComparisonOperandType {
                        op: op.symbol(),
                        left: left.type_name().to_string(),
                        right: right.type_name().to_string(),
                    }
                    .into());
                };
                let result = match op {
                    BinaryOperator::Less => a < b,
                    BinaryOperator::LessEqual => a <= b,
                    BinaryOperator::Greater => a > b,
                    _ => a >= b,
                };
                Ok(Value::Bool(result))
            }
            BinaryOperator::Add => match (&left, &right) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
                (Value::Str(a), Value::Str(b)) => {
                    let mut bytes = Vec::with_capacity(a.len() + b.len());
                    bytes.extend_from_slice(a);
                    bytes.extend_from_slice(b);
                    Ok(Value::string(bytes))
                }
                (Value::List(a), Value::List(b)) => {
                    let mut items = a.borrow().clone();
                    items.extend(b.borrow().iter().cloned());
                    Ok(Value::list(items))
                }
                _ => Err(RuntimeError::AdditionOperandType {
                    left: left.type_name().to_string(),
                    right: right.type_name().to_string(),
                }
                .into()),
            },
            BinaryOperator::Subtract | BinaryOperator::Multiply | BinaryOperator::Divide => {
                let (Value::Number(a), Value::Number(b)) = (&left, &right) else {
                    return Err(RuntimeError::ArithmeticOperandType {
                        op: op.symbol(),
                        left: left.type_name().to_string(),
                        right: right.type_name().to_string(),
                    }
                    .into());
                };
                let result = match op {
                    BinaryOperator::Subtract => a - b,
                    BinaryOperator::Multiply => a * b,
                    _ => a / b,
                };
                Ok(Value::Number(result))
            }
            BinaryOperator::Modulo => {
                let (Value::Number(a), Value::Number(b)) = (&left, &right) else {
                    return Err(RuntimeError::ArithmeticOperandType {
                        op: "%",
                        left: left.type_name().to_string(),
                        right: right.type_name().to_string(),
                    }
                    .into());
                };
                // Both operands round to the nearest integer first.
                let divisor = b.round() as i64;
                if divisor == 0 {
                    return Err(RuntimeError::ModuloByZero.into());
                }
                Ok(Value::Number(((a.round() as i64) % divisor) as f64))
            }
            BinaryOperator::And | BinaryOperator::Or => unreachable!("handled above"),
        }
    }

    fn eval_logic(
        &mut self,
        left: &Expression,
        op: BinaryOperator,
        right: &Expression,
        frame: &Rc<Frame>,
    ) -> EvalResult<Value> {
        let left = self.eval_value(left, frame)?;
        let Value::Bool(left) = &left else {
            return Err(RuntimeError::LogicOperandType {
                op: op.symbol(),
                found: left.type_name().to_string(),
            }
            .into());
        };

        // Short-circuit: the right side is only evaluated when it can still
        // decide the result.
        match (op, *left) {
            (BinaryOperator::And, false) => return Ok(Value::Bool(false)),
            (BinaryOperator::Or, true) => return Ok(Value::Bool(true)),
            _ => {}
        }

        let right = self.eval_value(right, frame)?;
        let Value::Bool(right) = &right else {
            return Err(RuntimeError::LogicOperandType {
                op: op.symbol(),
                found: right.type_name().to_string(),
            }
            .into());
        };
        Ok(Value::Bool(*right))
    }

    fn eval_assign(
        &mut self,
        target: &Expression,
        value: &Expression,
        frame: &Rc<Frame>,
    ) -> EvalResult<Value> {
        let target = self.eval_expression(target, frame)?;
        match target {
            Value::Identifier(name) => {
                let assigned = self.eval_value(value, frame)?;
                frame.assign(&name, assigned.clone());
                Ok(assigned)
            }
            Value::Reference(reference) => {
                let assigned = self.eval_value(value, frame)?;
                reference.set(assigned.clone())?;
                Ok(assigned)
            }
            other => Err(RuntimeError::InvalidAssignmentTarget {
                found: other.to_string(),
            }
            .into()),
        }
    }

    fn eval_if(
        &mut self,
        branches: &[IfBranch],
        else_body: Option<&[Expression]>,
        frame: &Rc<Frame>,
    ) -> EvalResult<Value> {
        let if_frame = frame.child();
        for branch in branches {
            let condition = self.eval_value(&branch.condition, &if_frame)?;
            let Value::Bool(truthy) = &condition else {
                return Err(RuntimeError::IfConditionType {
                    found: condition.type_name().to_string(),
                }
                .into());
            };
            if *truthy {
                return self.eval_body(&branch.body, &if_frame);
            }
        }
        match else_body {
            Some(body) => self.eval_body(body, &if_frame),
            None => Ok(Value::Nil),
        }
    }

    /// Evaluates a braced body and yields the last expression's value.
    fn eval_body(&mut self, body: &[Expression], frame: &Rc<Frame>) -> EvalResult<Value> {
        let mut result = Value::Nil;
        for expression in body {
            result = self.eval_value(expression, frame)?;
        }
        Ok(result)
    }

    fn eval_for(
        &mut self,
        init: &[Expression],
        condition: Option<&Expression>,
        post: Option<&Expression>,
        body: &[Expression],
        frame: &Rc<Frame>,
    ) -> EvalResult<Value> {
        let loop_frame = frame.child();
        for expression in init {
            self.eval_value(expression, &loop_frame)?;
        }

        let mut iterations = 0.0f64;
        loop {
            let proceed = match condition {
                Some(expression) => {
                    let value = self.eval_value(expression, &loop_frame)?;
                    let Value::Bool(b) = &value else {
                        return Err(RuntimeError::ForConditionType {
                            found: value.type_name().to_string(),
                        }
                        .into());
                    };
                    *b
                }
                // `for { ... }` loops until a break or return unwinds it.
                None => true,
            };
            if !proceed {
                break;
            }

            match self.run_loop_body(body, &loop_frame) {
                Ok(()) => {}
                Err(Signal::Break(_)) => return Ok(Value::Number(iterations)),
                // continue still runs the post expression.
                Err(Signal::Continue(_)) => {}
                Err(other) => return Err(other),
            }
            if let Some(expression) = post {
                self.eval_value(expression, &loop_frame)?;
            }
            iterations += 1.0;
        }
        Ok(Value::Number(iterations))
    }

    fn eval_for_in(
        &mut self,
        key: Option<&str>,
        binding: &str,
        iterable: &Expression,
        body: &[Expression],
        frame: &Rc<Frame>,
    ) -> EvalResult<Value> {
        let loop_frame = frame.child();
        let collection = self.eval_value(iterable, &loop_frame)?;
        let mut iterations = 0.0f64;

        match collection {
            Value::List(items) => {
                // Bounds are re-checked every pass so the body may grow or
                // shrink the list mid-iteration.
                let mut index = 0usize;
                loop {
                    let item = match items.borrow().get(index) {
                        Some(value) => value.clone(),
                        None => break,
                    };
                    if let Some(key_name) = key {
                        loop_frame.declare(key_name, Value::Number(index as f64));
                    }
                    loop_frame.declare(binding, item);
                    match self.run_loop_body(body, &loop_frame) {
                        Ok(()) => {}
                        Err(Signal::Break(_)) => return Ok(Value::Number(iterations)),
                        Err(Signal::Continue(_)) => {}
                        Err(other) => return Err(other),
                    }
                    index += 1;
                    iterations += 1.0;
                }
            }
            Value::Str(bytes) => {
                for (index, byte) in bytes.iter().enumerate() {
                    if let Some(key_name) = key {
                        loop_frame.declare(key_name, Value::Number(index as f64));
                    }
                    loop_frame.declare(binding, Value::string(vec![*byte]));
                    match self.run_loop_body(body, &loop_frame) {
                        Ok(()) => {}
                        Err(Signal::Break(_)) => return Ok(Value::Number(iterations)),
                        Err(Signal::Continue(_)) => {}
                        Err(other) => return Err(other),
                    }
                    iterations += 1.0;
                }
            }
            Value::Dict(entries) => {
                // Iterate a snapshot of the keys; entries are never removed.
                let keys: Vec<String> = entries.borrow().keys().cloned().collect();
                for dict_key in keys {
                    let item = match entries.borrow().get(&dict_key) {
                        Some(value) => value.clone(),
                        None => continue,
                    };
                    if let Some(key_name) = key {
                        loop_frame.declare(key_name, Value::string(dict_key.as_bytes()));
                    }
                    loop_frame.declare(binding, item);
                    match self.run_loop_body(body, &loop_frame) {
                        Ok(()) => {}
                        Err(Signal::Break(_)) => return Ok(Value::Number(iterations)),
                        Err(Signal::Continue(_)) => {}
                        Err(other) => return Err(other),
                    }
                    iterations += 1.0;
                }
            }
            other => {
                return Err(RuntimeError::NotIterable {
                    found: other.type_name().to_string(),
                }
                .into());
            }
        }
        Ok(Value::Number(iterations))
    }

    fn run_loop_body(&mut self, body: &[Expression], frame: &Rc<Frame>) -> EvalResult<()> {
        for expression in body {
            self.eval_value(expression, frame)?;
        }
        Ok(())
    }

    fn eval_dict_literal(&mut self, entries: &[DictEntry], frame: &Rc<Frame>) -> EvalResult<Value> {
        let mut map = BTreeMap::new();
        for entry in entries {
            let key = match &entry.key {
                DictKey::Identifier(name) => name.clone(),
                DictKey::Expression(expression) => {
                    let value = self.eval_value(expression, frame)?;
                    dict_key_from(&value)?
                }
            };
            let value = self.eval_value(&entry.value, frame)?;
            map.insert(key, value);
        }
        Ok(Value::dict(map))
    }

    fn eval_call(
        &mut self,
        callee: &Expression,
        chain: &[CallStep],
        frame: &Rc<Frame>,
    ) -> EvalResult<Value> {
        let mut value = match callee {
            Expression::Identifier(name) => frame.lookup(name)?,
            other => self.eval_value(other, frame)?,
        };

        let mut step_index = 0;
        while step_index < chain.len() {
            // Intermediate references are transparent; only the final step's
            // reference survives so indexed lvalues can be written through.
            if let Value::Reference(reference) = &value {
                value = reference.get()?;
            }
            match &chain[step_index] {
                CallStep::Call(arg_exprs) => {
                    let args = self.eval_args(arg_exprs, frame)?;
                    value = self.call_value(&value, args)?;
                }
                CallStep::Member(name) => {
                    value = match &value {
                        Value::List(items) => {
                            let items = Rc::clone(items);
                            self.eval_list_method(&items, name, chain, &mut step_index, frame)?
                        }
                        Value::Dict(entries) => dict_member(entries, name),
                        other => {
                            return Err(RuntimeError::UnknownMember {
                                found: other.type_name().to_string(),
                                name: name.clone(),
                            }
                            .into());
                        }
                    };
                }
                CallStep::Index(index_expr) => {
                    let access = self.eval_value(index_expr, frame)?;
                    value = match &value {
                        Value::List(items) => list_index(items, &access)?,
                        Value::Str(bytes) => string_index(bytes, &access)?,
                        Value::Dict(entries) => dict_index(entries, &access)?,
                        other => {
                            return Err(RuntimeError::NotIndexable {
                                found: other.type_name().to_string(),
                            }
                            .into());
                        }
                    };
                }
            }
            step_index += 1;
        }
        Ok(value)
    }

    fn eval_args(&mut self, arg_exprs: &[Expression], frame: &Rc<Frame>) -> EvalResult<Vec<Value>> {
        let mut args = Vec::with_capacity(arg_exprs.len());
        for expression in arg_exprs {
            args.push(self.eval_value(expression, frame)?);
        }
        Ok(args)
    }

    fn call_value(&mut self, callee: &Value, args: Vec<Value>) -> EvalResult<Value> {
        match callee {
            Value::Function(function) => self.call_function(function, args),
            Value::Native(native) => Ok(self.call_native(*native, args)?),
            other => Err(RuntimeError::NotCallable {
                found: other.type_name().to_string(),
            }
            .into()),
        }
    }

    /// Executes a user function in a fresh child of its capture frame and
    /// catches `return` unwinding out of the body.
    fn call_function(&mut self, function: &Function, args: Vec<Value>) -> EvalResult<Value> {
        if args.len() != function.params.len() {
            return Err(RuntimeError::FunctionArity {
                expected: function.params.len(),
                found: args.len(),
            }
            .into());
        }
        let call_frame = function.frame.child();
        for (param, arg) in function.params.iter().zip(args) {
            call_frame.declare(param, arg);
        }

        let mut result = Value::Nil;
        for expression in &function.body {
            result = match self.eval_value(expression, &call_frame) {
                Ok(value) => value,
                Err(Signal::Return(_, value)) => return Ok(value),
                Err(other) => return Err(other),
            };
        }
        Ok(result)
    }

    /// `append`/`prepend`/`pop`/`pop_left` on lists consume the following
    /// `(args)` step of the chain.
    fn eval_list_method(
        &mut self,
        items: &Rc<RefCell<Vec<Value>>>,
        name: &str,
        chain: &[CallStep],
        step_index: &mut usize,
        frame: &Rc<Frame>,
    ) -> EvalResult<Value> {
        let method: &'static str = match name {
            "append" => "append",
            "prepend" => "prepend",
            "pop" => "pop",
            "pop_left" => "pop_left",
            _ => {
                return Err(RuntimeError::UnknownMember {
                    found: "list".to_string(),
                    name: name.to_string(),
                }
                .into());
            }
        };
        let Some(CallStep::Call(arg_exprs)) = chain.get(*step_index + 1) else {
            return Err(RuntimeError::ListMethodNotCalled { method }.into());
        };
        *step_index += 1;
        let args = self.eval_args(arg_exprs, frame)?;

        match method {
            "append" | "prepend" => {
                let value = match <[Value; 1]>::try_from(args) {
                    Ok([value]) => value,
                    Err(args) => {
                        return Err(RuntimeError::ListMethodArity {
                            method,
                            expected: 1,
                            found: args.len(),
                        }
                        .into());
                    }
                };
                if method == "append" {
                    items.borrow_mut().push(value);
                } else {
                    items.borrow_mut().insert(0, value);
                }
                Ok(Value::Nil)
            }
            _ => {
                if !args.is_empty() {
                    return Err(RuntimeError::ListMethodArity {
                        method,
                        expected: 0,
                        found: args.len(),
                    }
                    .into());
                }
                let mut items = items.borrow_mut();
                if items.is_empty() {
                    return Err(RuntimeError::PopFromEmptyList { method }.into());
                }
                let removed = if method == "pop" {
                    let last = items.len() - 1;
                    items.remove(last)
                } else {
                    items.remove(0)
                };
                Ok(removed)
            }
        }
    }

    fn call_native(
        &mut self,
        native: NativeFunction,
        args: Vec<Value>,
    ) -> Result<Value, RuntimeError> {
        match native {
            NativeFunction::Assert => {
                let [left, right] = take_args(native, args)?;
                if left.equals(&right)? {
                    Ok(Value::Nil)
                } else {
                    Err(RuntimeError::AssertFailed {
                        left: left.to_string(),
                        right: right.to_string(),
                    })
                }
            }
            NativeFunction::In => {
                if !args.is_empty() {
                    return Err(RuntimeError::NativeArity {
                        function: native.name(),
                        expected: 0,
                        found: args.len(),
                    });
                }
                let mut line = String::new();
                io::stdin()
                    .read_line(&mut line)
                    .map_err(|error| RuntimeError::Io {
                        message: error.to_string(),
                    })?;
                while line.ends_with('\n') || line.ends_with('\r') {
                    line.pop();
                }
                Ok(Value::string(line.into_bytes()))
            }
            NativeFunction::Log => {
                let rendered = args
                    .iter()
                    .map(Value::to_string)
                    .collect::<Vec<_>>()
                    .join(", ");
                writeln!(self.output, "{rendered}").map_err(|error| RuntimeError::Io {
                    message: error.to_string(),
                })?;
                Ok(Value::Nil)
            }
            NativeFunction::Type => {
                let [value] = take_args(native, args)?;
                Ok(Value::string(value.type_name()))
            }
            NativeFunction::Str => {
                let [value] = take_args(native, args)?;
                match value {
                    Value::Str(_) => Ok(value),
                    Value::Number(n) => Ok(Value::string(format_number(n))),
                    Value::Bool(b) => Ok(Value::string(b.to_string())),
                    other => Err(RuntimeError::NativeArgumentType {
                        function: "str",
                        expected: "a string, number, or bool",
                        found: other.type_name().to_string(),
                    }),
                }
            }
            NativeFunction::Num => {
                let [value] = take_args(native, args)?;
                let Value::Str(bytes) = &value else {
                    return Err(RuntimeError::NativeArgumentType {
                        function: "num",
                        expected: "a string",
                        found: value.type_name().to_string(),
                    });
                };
                let text = String::from_utf8_lossy(bytes);
                text.parse::<f64>()
                    .map(Value::Number)
                    .map_err(|_| RuntimeError::NumberParse {
                        literal: text.into_owned(),
                    })
            }
            NativeFunction::Len => {
                let [value] = take_args(native, args)?;
                let length = match &value {
                    Value::Str(bytes) => bytes.len(),
                    Value::List(items) => items.borrow().len(),
                    Value::Dict(entries) => entries.borrow().len(),
                    other => {
                        return Err(RuntimeError::NativeArgumentType {
                            function: "len",
                            expected: "a string, list, or dict",
                            found: other.type_name().to_string(),
                        });
                    }
                };
                Ok(Value::Number(length as f64))
            }
            NativeFunction::Keys => {
                let [value] = take_args(native, args)?;
                let Value::Dict(entries) = &value else {
                    return Err(RuntimeError::NativeArgumentType {
                        function: "keys",
                        expected: "a dict",
                        found: value.type_name().to_string(),
                    });
                };
                let keys = entries
                    .borrow()
                    .keys()
                    .map(|key| Value::string(key.as_bytes()))
                    .collect();
                Ok(Value::list(keys))
            }
            NativeFunction::Values => {
                let [value] = take_args(native, args)?;
                let Value::Dict(entries) = &value else {
                    return Err(RuntimeError::NativeArgumentType {
                        function: "values",
                        expected: "a dict",
                        found: value.type_name().to_string(),
                    });
                };
                let values = entries.borrow().values().cloned().collect();
                Ok(Value::list(values))
            }
        }
    }
}

fn unwrap_transient(value: Value, frame: &Rc<Frame>) -> Result<Value, RuntimeError> {
    match value {
        Value::Identifier(name) => frame.lookup(&name),
        Value::Reference(reference) => reference.get(),
        other => Ok(other),
    }
}

/// Dict keys are always stored as strings: string values contribute their
/// contents, numbers their printed form.
fn dict_key_from(value: &Value) -> Result<String, RuntimeError> {
    match value {
        Value::Str(bytes) => Ok(String::from_utf8_lossy(bytes).into_owned()),
        Value::Number(n) => Ok(format_number(*n)),
        other => Err(RuntimeError::DictKeyType {
            found: other.type_name().to_string(),
        }),
    }
}

/// Member access on a dict auto-vivifies a Nil entry so `d.k = v` works for
/// keys that do not exist yet.
fn dict_member(entries: &Rc<RefCell<BTreeMap<String, Value>>>, name: &str) -> Value {
    let key = name.to_string();
    entries.borrow_mut().entry(key.clone()).or_insert(Value::Nil);
    Value::Reference(Reference::Dict {
        dict: Rc::clone(entries),
        key,
    })
}

fn dict_index(
    entries: &Rc<RefCell<BTreeMap<String, Value>>>,
    access: &Value,
) -> Result<Value, RuntimeError> {
    let key = dict_key_from(access)?;
    entries.borrow_mut().entry(key.clone()).or_insert(Value::Nil);
    Ok(Value::Reference(Reference::Dict {
        dict: Rc::clone(entries),
        key,
    }))
}

fn list_index(items: &Rc<RefCell<Vec<Value>>>, access: &Value) -> Result<Value, RuntimeError> {
    let Value::Number(n) = access else {
        return Err(RuntimeError::ListAccessType {
            found: access.type_name().to_string(),
        });
    };
    let index = *n as i64;
    if index < 0 || index as usize >= items.borrow().len() {
        return Err(RuntimeError::ListIndexOutOfBounds { index });
    }
    Ok(Value::Reference(Reference::List {
        list: Rc::clone(items),
        index: index as usize,
    }))
}

fn string_index(bytes: &Rc<Vec<u8>>, access: &Value) -> Result<Value, RuntimeError> {
    let Value::Number(n) = access else {
        return Err(RuntimeError::StringAccessType {
            found: access.type_name().to_string(),
        });
    };
    let index = *n as i64;
    if index < 0 || index as usize >= bytes.len() {
        return Err(RuntimeError::StringIndexOutOfBounds { index });
    }
    Ok(Value::string(vec![bytes[index as usize]]))
}

fn take_args<const N: usize>(
    native: NativeFunction,
    args: Vec<Value>,
) -> Result<[Value; N], RuntimeError> {
    <[Value; N]>::try_from(args).map_err(|args| RuntimeError::NativeArity {
        function: native.name(),
        expected: N,
        found: args.len(),
    })
}
