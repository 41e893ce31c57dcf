/// The fixed set of native runtime functions injected into the root frame.
/// Dispatch lives in the evaluator, which owns the output sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NativeFunction {
    Assert,
    In,
    Log,
    Type,
    Str,
    Num,
    Len,
    Keys,
    Values,
}

impl NativeFunction {
    pub const ALL: [NativeFunction; 9] = [
        Self::Assert,
        Self::In,
        Self::Log,
        Self::Type,
        Self::Str,
        Self::Num,
        Self::Len,
        Self::Keys,
        Self::Values,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Assert => "assert",
            Self::In => "in",
            Self::Log => "log",
            Self::Type => "type",
            Self::Str => "str",
            Self::Num => "num",
            Self::Len => "len",
            Self::Keys => "keys",
            Self::Values => "values",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|native| native.name() == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip() {
        for native in NativeFunction::ALL {
            assert_eq!(NativeFunction::from_name(native.name()), Some(native));
        }
        assert_eq!(NativeFunction::from_name("print"), None);
    }
}
