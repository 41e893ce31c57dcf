use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use crate::builtins::NativeFunction;
use crate::parser::ast::Expression;

use super::error::RuntimeError;
use super::frame::Frame;

/// Runtime value model. `Identifier` and `Reference` are transient carriers:
/// an `Identifier` is an unresolved name produced by evaluating an ident,
/// a `Reference` denotes a mutable cell inside a list or dict. Both are
/// collapsed to plain values at every rvalue position.
#[derive(Debug, Clone)]
pub enum Value {
    Nil,
    Bool(bool),
    Number(f64),
    Str(Rc<Vec<u8>>),
    List(Rc<RefCell<Vec<Value>>>),
    Dict(Rc<RefCell<BTreeMap<String, Value>>>),
    Function(Rc<Function>),
    Native(NativeFunction),
    Identifier(String),
    Reference(Reference),
}

/// A user function: parameter names, body expressions, and the frame
/// captured at the literal's evaluation site.
pub struct Function {
    pub params: Vec<String>,
    pub body: Vec<Expression>,
    pub frame: Rc<Frame>,
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // The capture frame can reach this function again; keep Debug acyclic.
        f.debug_struct("Function")
            .field("params", &self.params)
            .finish()
    }
}

/// A handle to one mutable slot inside a container. Dereferencing reads the
/// current slot contents; writing through mutates the container in place.
#[derive(Debug, Clone)]
pub enum Reference {
    List {
        list: Rc<RefCell<Vec<Value>>>,
        index: usize,
    },
    Dict {
        dict: Rc<RefCell<BTreeMap<String, Value>>>,
        key: String,
    },
}

impl Reference {
    pub fn get(&self) -> Result<Value, RuntimeError> {
        match self {
            Reference::List { list, index } => list
                .borrow()
                .get(*index)
                .cloned()
                .ok_or(RuntimeError::StaleReference),
            Reference::Dict { dict, key } => dict
                .borrow()
                .get(key)
                .cloned()
                .ok_or(RuntimeError::StaleReference),
        }
    }

    pub fn set(&self, value: Value) -> Result<(), RuntimeError> {
        match self {
            Reference::List { list, index } => {
                let mut items = list.borrow_mut();
                let slot = items
                    .get_mut(*index)
                    .ok_or(RuntimeError::StaleReference)?;
                *slot = value;
                Ok(())
            }
            Reference::Dict { dict, key } => {
                dict.borrow_mut().insert(key.clone(), value);
                Ok(())
            }
        }
    }
}

impl Value {
    pub fn string(text: impl Into<Vec<u8>>) -> Value {
        Value::Str(Rc::new(text.into()))
    }

    pub fn list(values: Vec<Value>) -> Value {
        Value::List(Rc::new(RefCell::new(values)))
    }

    pub fn dict(entries: BTreeMap<String, Value>) -> Value {
        Value::Dict(Rc::new(RefCell::new(entries)))
    }

    /// The name reported by `type()` and used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Bool(_) => "bool",
            Value::Number(_) => "number",
            Value::Str(_) => "string",
            Value::List(_) => "list",
            Value::Dict(_) => "dict",
            Value::Function(_) | Value::Native(_) => "function",
            Value::Identifier(_) => "identifier",
            Value::Reference(_) => "reference",
        }
    }

    /// Value equality as observed by `==` and `assert`. Ordinary mismatched
    /// types compare unequal without error; an unresolved identifier on the
    /// left means an unbound name slipped through and is reported.
    pub fn equals(&self, other: &Value) -> Result<bool, RuntimeError> {
        if let Value::Identifier(name) = self {
            return Err(RuntimeError::UninitializedComparison { name: name.clone() });
        }
        Ok(match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Native(a), Value::Native(b)) => a.name() == b.name(),
            _ => false,
        })
    }
}

/// Minimal decimal form: shortest representation that round-trips, no
/// trailing zeros, never scientific notation.
pub fn format_number(n: f64) -> String {
    format!("{n}")
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Number(n) => write!(f, "{}", format_number(*n)),
            Value::Str(bytes) => write!(f, "{}", String::from_utf8_lossy(bytes)),
            Value::List(items) => {
                let rendered = items
                    .borrow()
                    .iter()
                    .map(Value::to_string)
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(f, "[{rendered}]")
            }
            Value::Dict(entries) => {
                let rendered = entries
                    .borrow()
                    .iter()
                    .map(|(key, value)| format!("{key}: {value}"))
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(f, "{{{rendered}}}")
            }
            Value::Function(_) => write!(f, "function"),
            Value::Native(native) => write!(f, "{} function", native.name()),
            Value::Identifier(name) => write!(f, "{name}"),
            Value::Reference(_) => write!(f, "reference"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_print_in_minimal_decimal_form() {
        assert_eq!(Value::Number(3.0).to_string(), "3");
        assert_eq!(Value::Number(2.5).to_string(), "2.5");
        assert_eq!(Value::Number(-0.125).to_string(), "-0.125");
        assert_eq!(Value::Number(100000000000000000000.0).to_string(), "100000000000000000000");
    }

    #[test]
    fn printed_forms_match_the_language_surface() {
        assert_eq!(Value::Nil.to_string(), "nil");
        assert_eq!(Value::Bool(true).to_string(), "true");
        assert_eq!(Value::string("raw bytes").to_string(), "raw bytes");
        assert_eq!(
            Value::list(vec![Value::Number(1.0), Value::string("two")]).to_string(),
            "[1, two]"
        );
        assert_eq!(
            Value::dict(BTreeMap::from([("k".to_string(), Value::Number(1.0))])).to_string(),
            "{k: 1}"
        );
        assert_eq!(Value::Native(NativeFunction::Log).to_string(), "log function");
    }

    #[test]
    fn equality_matrix() {
        assert!(Value::Nil.equals(&Value::Nil).expect("equals"));
        assert!(Value::Bool(true).equals(&Value::Bool(true)).expect("equals"));
        assert!(!Value::Bool(true).equals(&Value::Bool(false)).expect("equals"));
        assert!(Value::Number(1.5).equals(&Value::Number(1.5)).expect("equals"));
        assert!(Value::string("a").equals(&Value::string("a")).expect("equals"));
        assert!(!Value::string("a").equals(&Value::string("b")).expect("equals"));
        assert!(
            Value::Native(NativeFunction::Len)
                .equals(&Value::Native(NativeFunction::Len))
                .expect("equals")
        );
    }

    #[test]
    fn mismatched_types_compare_unequal_without_error() {
        assert!(!Value::Number(1.0).equals(&Value::string("1")).expect("equals"));
        assert!(!Value::Nil.equals(&Value::Bool(false)).expect("equals"));
        assert!(
            !Value::list(vec![])
                .equals(&Value::list(vec![]))
                .expect("lists never compare equal")
        );
    }

    #[test]
    fn identifier_comparison_is_an_error() {
        let err = Value::Identifier("ghost".to_string())
            .equals(&Value::Nil)
            .expect_err("expected comparison failure");
        assert_eq!(
            err,
            RuntimeError::UninitializedComparison {
                name: "ghost".to_string()
            }
        );
    }

    #[test]
    fn nan_is_not_equal_to_itself() {
        assert!(!Value::Number(f64::NAN).equals(&Value::Number(f64::NAN)).expect("equals"));
    }

    #[test]
    fn list_reference_reads_and_writes_through() {
        let list = Rc::new(RefCell::new(vec![Value::Number(1.0), Value::Number(2.0)]));
        let reference = Reference::List {
            list: Rc::clone(&list),
            index: 1,
        };

        assert!(reference.get().expect("get").equals(&Value::Number(2.0)).expect("equals"));
        reference.set(Value::Number(9.0)).expect("set");
        assert_eq!(Value::List(list).to_string(), "[1, 9]");
    }

    #[test]
    fn reference_to_removed_slot_is_stale() {
        let list = Rc::new(RefCell::new(vec![Value::Number(1.0)]));
        let reference = Reference::List {
            list: Rc::clone(&list),
            index: 0,
        };
        list.borrow_mut().pop();

        assert_eq!(reference.get().expect_err("expected stale read"), RuntimeError::StaleReference);
        assert_eq!(
            reference.set(Value::Nil).expect_err("expected stale write"),
            RuntimeError::StaleReference
        );
    }

    #[test]
    fn dict_reference_inserts_through_missing_key() {
        let dict = Rc::new(RefCell::new(BTreeMap::new()));
        let reference = Reference::Dict {
            dict: Rc::clone(&dict),
            key: "k".to_string(),
        };
        reference.set(Value::Number(7.0)).expect("set");
        assert_eq!(Value::Dict(dict).to_string(), "{k: 7}");
    }
}
