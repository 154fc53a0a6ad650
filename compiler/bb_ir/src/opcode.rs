//! Operation codes of the bytecode.

use std::fmt;

macro_rules! opcodes {
    ($($variant:ident => $name:literal),+ $(,)?) => {
        /// A bytecode operation.
        ///
        /// The text spelling is what appears at the start of each `.bbvm`
        /// line; it is also what diagnostics print.
        #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
        pub enum OpCode {
            $($variant),+
        }

        impl OpCode {
            pub const ALL: &'static [OpCode] = &[$(OpCode::$variant),+];

            pub const fn name(self) -> &'static str {
                match self {
                    $(OpCode::$variant => $name),+
                }
            }

            pub fn from_name(name: &str) -> Option<OpCode> {
                match name {
                    $($name => Some(OpCode::$variant),)+
                    _ => None,
                }
            }
        }
    };
}

opcodes! {
    Not => "not",
    And => "and",
    Or => "or",
    Eq => "eq",
    Neq => "neq",
    Le => "le",
    Ge => "ge",
    Lt => "lt",
    Gt => "gt",
    Add => "add",
    Sub => "sub",
    Mul => "mul",
    MMul => "mmul",
    Div => "div",
    Mod => "mod",
    Len => "len",
    Pow => "pow",
    Log => "log",
    Push => "push",
    Pop => "pop",
    Next => "next",
    Put => "put",
    At => "at",
    ToVector => "vector",
    ToList => "list",
    ToMap => "map",
    ToInt => "int",
    ToFloat => "float",
    ToStr => "str",
    ToBool => "bool",
    ToCopy => "copy",
    Sum => "sum",
    Max => "max",
    Min => "min",
    ToRange => "range",
    ToIter => "iter",
    Clear => "clear",
    Move => "move",
    Builtin => "BUILTIN",
    Begin => "BEGIN",
    BeginFinal => "BEGINFINAL",
    BeginCache => "BEGINCACHE",
    End => "END",
    Return => "return",
    Final => "final",
    Is => "IS",
    As => "AS",
    Exists => "exists",
    Call => "call",
    While => "while",
    If => "if",
    New => "new",
    Print => "print",
    Read => "read",
    Inline => "inline",
    Get => "get",
    Set => "set",
    SetFinal => "setfinal",
    Default => "default",
    Time => "time",
    Try => "try",
    Catch => "catch",
    Fail => "fail",
    Defer => "defer",
    IsCached => "ISCACHED",
}

impl OpCode {
    /// Opens a block that runs until the matching `END`.
    #[inline]
    pub fn opens_block(self) -> bool {
        matches!(self, OpCode::Begin | OpCode::BeginFinal | OpCode::BeginCache)
    }

    /// Operations that turn a failure into an error value stored in their
    /// destination instead of unwinding the current block.
    #[inline]
    pub fn stores_errors(self) -> bool {
        matches!(
            self,
            OpCode::Set
                | OpCode::SetFinal
                | OpCode::Put
                | OpCode::Push
                | OpCode::Pop
                | OpCode::Next
                | OpCode::Clear
                | OpCode::Final
                | OpCode::Print
                | OpCode::Read
        )
    }

    /// Struct field consulted when this operation reaches a struct.
    pub fn overload_name(self) -> Option<&'static str> {
        let name = match self {
            OpCode::Not => "\\not",
            OpCode::And => "\\and",
            OpCode::Or => "\\or",
            OpCode::Eq => "\\eq",
            OpCode::Neq => "\\neq",
            OpCode::Le => "\\le",
            OpCode::Ge => "\\ge",
            OpCode::Lt => "\\lt",
            OpCode::Gt => "\\gt",
            OpCode::Add => "\\add",
            OpCode::Sub => "\\sub",
            OpCode::Mul => "\\mul",
            OpCode::MMul => "\\mmul",
            OpCode::Div => "\\div",
            OpCode::Mod => "\\mod",
            OpCode::Pow => "\\pow",
            OpCode::Len => "\\len",
            OpCode::Log => "\\log",
            OpCode::Push => "\\push",
            OpCode::Pop => "\\pop",
            OpCode::Next => "\\next",
            OpCode::Put => "\\put",
            OpCode::At => "\\at",
            OpCode::ToVector => "\\vector",
            OpCode::ToList => "\\list",
            OpCode::ToMap => "\\map",
            OpCode::ToInt => "\\int",
            OpCode::ToFloat => "\\float",
            OpCode::ToStr => "\\str",
            OpCode::ToBool => "\\bool",
            OpCode::ToCopy => "\\copy",
            OpCode::Sum => "\\sum",
            OpCode::Max => "\\max",
            OpCode::Min => "\\min",
            OpCode::ToIter => "\\iter",
            OpCode::Clear => "\\clear",
            OpCode::Move => "\\move",
            _ => return None,
        };
        Some(name)
    }

    /// Field consulted when a struct is the right operand of this binary
    /// operation.
    pub fn mirrored_overload_name(self) -> Option<&'static str> {
        let name = match self {
            OpCode::And => "\\rand",
            OpCode::Or => "\\ror",
            OpCode::Eq => "\\req",
            OpCode::Neq => "\\rneq",
            OpCode::Le => "\\rle",
            OpCode::Ge => "\\rge",
            OpCode::Lt => "\\rlt",
            OpCode::Gt => "\\rgt",
            OpCode::Add => "\\radd",
            OpCode::Sub => "\\rsub",
            OpCode::Mul => "\\rmul",
            OpCode::MMul => "\\rmmul",
            OpCode::Div => "\\rdiv",
            OpCode::Mod => "\\rmod",
            OpCode::Pow => "\\rpow",
            _ => return None,
        };
        Some(name)
    }

    /// Binary operations whose operands may be swapped freely.
    #[inline]
    pub fn is_commutative(self) -> bool {
        matches!(
            self,
            OpCode::Add | OpCode::Mul | OpCode::Eq | OpCode::Neq | OpCode::And | OpCode::Or
        )
    }

    /// Minimum operand count, destination included.
    pub fn min_operands(self) -> usize {
        match self {
            OpCode::Begin
            | OpCode::BeginFinal
            | OpCode::BeginCache
            | OpCode::Time
            | OpCode::ToList
            | OpCode::ToMap
            | OpCode::ToVector
            | OpCode::Print
            | OpCode::Read
            | OpCode::Builtin => 1,
            OpCode::End => 0,
            OpCode::Not
            | OpCode::Len
            | OpCode::Log
            | OpCode::Pop
            | OpCode::Next
            | OpCode::ToInt
            | OpCode::ToFloat
            | OpCode::ToStr
            | OpCode::ToBool
            | OpCode::ToCopy
            | OpCode::Sum
            | OpCode::Max
            | OpCode::Min
            | OpCode::ToRange
            | OpCode::ToIter
            | OpCode::Clear
            | OpCode::Move
            | OpCode::Return
            | OpCode::Final
            | OpCode::Is
            | OpCode::As
            | OpCode::Exists
            | OpCode::New
            | OpCode::Inline
            | OpCode::Default
            | OpCode::Try
            | OpCode::Fail
            | OpCode::Defer
            | OpCode::IsCached => 2,
            OpCode::And
            | OpCode::Or
            | OpCode::Eq
            | OpCode::Neq
            | OpCode::Le
            | OpCode::Ge
            | OpCode::Lt
            | OpCode::Gt
            | OpCode::Add
            | OpCode::Sub
            | OpCode::Mul
            | OpCode::MMul
            | OpCode::Div
            | OpCode::Mod
            | OpCode::Pow
            | OpCode::Push
            | OpCode::At
            | OpCode::Call
            | OpCode::While
            | OpCode::If
            | OpCode::Get
            | OpCode::Catch => 3,
            OpCode::Put | OpCode::Set | OpCode::SetFinal => 4,
        }
    }
}

impl fmt::Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
