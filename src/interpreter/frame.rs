use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use super::error::RuntimeError;
use super::value::Value;

/// One node of the lexical scope chain. Child frames are created for calls,
/// `if` bodies, and loop bodies; closures keep their defining frame alive.
#[derive(Debug, Default)]
pub struct Frame {
    bindings: RefCell<HashMap<String, Value>>,
    parent: Option<Rc<Frame>>,
}

impl Frame {
    pub fn root() -> Rc<Frame> {
        Rc::new(Frame::default())
    }

    pub fn child(self: &Rc<Self>) -> Rc<Frame> {
        Rc::new(Frame {
            bindings: RefCell::new(HashMap::new()),
            parent: Some(Rc::clone(self)),
        })
    }

    /// Walks the parent chain; unbound names are always an error, there is
    /// no implicit nil.
    pub fn lookup(&self, name: &str) -> Result<Value, RuntimeError> {
        if let Some(value) = self.bindings.borrow().get(name) {
            return Ok(value.clone());
        }
        match &self.parent {
            Some(parent) => parent.lookup(name),
            None => Err(RuntimeError::UndefinedName {
                name: name.to_string(),
            }),
        }
    }

    /// Write-up assignment: if `name` is bound anywhere up the chain the
    /// existing binding is updated in place; otherwise the binding is
    /// created in this frame. Closures mutate captured variables through
    /// this, and loop bodies accumulate into outer scopes.
    pub fn assign(self: &Rc<Self>, name: &str, value: Value) {
        let mut frame = Rc::clone(self);
        loop {
            if frame.bindings.borrow().contains_key(name) {
                frame
                    .bindings
                    .borrow_mut()
                    .insert(name.to_string(), value);
                return;
            }
            let Some(parent) = frame.parent.as_ref().map(Rc::clone) else {
                break;
            };
            frame = parent;
        }
        self.bindings.borrow_mut().insert(name.to_string(), value);
    }

    /// Binds `name` in this frame without consulting ancestors. Used for
    /// function parameters, loop variables, and the injected natives.
    pub fn declare(&self, name: &str, value: Value) {
        self.bindings.borrow_mut().insert(name.to_string(), value);
    }

    /// Renders the chain for `--debug`, innermost frame first.
    pub fn dump(&self) -> String {
        let bindings = self.bindings.borrow();
        let mut names: Vec<&String> = bindings.keys().collect();
        names.sort();
        let mut rendered = String::from("[");
        for name in names {
            rendered.push_str(name);
            rendered.push_str(": ");
            rendered.push_str(&bindings[name].to_string());
            rendered.push_str(", ");
        }
        rendered.push_str("] --> ");
        match &self.parent {
            Some(parent) => rendered + &parent.dump(),
            None => rendered + "*",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_walks_the_parent_chain() {
        let root = Frame::root();
        root.declare("a", Value::Number(1.0));
        let child = root.child();
        let grandchild = child.child();

        let found = grandchild.lookup("a").expect("lookup failed");
        assert!(found.equals(&Value::Number(1.0)).expect("equals"));
    }

    #[test]
    fn lookup_of_unbound_name_is_an_error() {
        let root = Frame::root();
        let err = root.lookup("missing").expect_err("expected lookup failure");
        assert_eq!(
            err,
            RuntimeError::UndefinedName {
                name: "missing".to_string()
            }
        );
        assert_eq!(err.to_string(), "cannot find value for 'missing'");
    }

    #[test]
    fn assign_updates_existing_outer_binding() {
        let root = Frame::root();
        root.declare("n", Value::Number(0.0));
        let inner = root.child();

        inner.assign("n", Value::Number(5.0));

        let at_root = root.lookup("n").expect("lookup failed");
        assert!(at_root.equals(&Value::Number(5.0)).expect("equals"));
        assert!(!inner.bindings.borrow().contains_key("n"));
    }

    #[test]
    fn assign_creates_binding_in_current_frame_when_unbound() {
        let root = Frame::root();
        let inner = root.child();

        inner.assign("fresh", Value::Bool(true));

        assert!(inner.bindings.borrow().contains_key("fresh"));
        assert!(root.lookup("fresh").is_err());
    }

    #[test]
    fn declare_shadows_outer_binding() {
        let root = Frame::root();
        root.declare("x", Value::Number(1.0));
        let inner = root.child();
        inner.declare("x", Value::Number(2.0));

        let seen = inner.lookup("x").expect("lookup failed");
        assert!(seen.equals(&Value::Number(2.0)).expect("equals"));
        let outer = root.lookup("x").expect("lookup failed");
        assert!(outer.equals(&Value::Number(1.0)).expect("equals"));
    }

    #[test]
    fn dump_renders_the_chain() {
        let root = Frame::root();
        root.declare("a", Value::Number(1.0));
        let child = root.child();
        child.declare("b", Value::Bool(true));

        assert_eq!(child.dump(), "[b: true, ] --> [a: 1, ] --> *");
    }
}
