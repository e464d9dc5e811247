//! Stack machine instructions.
use smol_str::SmolStr;
use std::fmt;

/// Intermediate representation, one variant per VM instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VmCommand {
    /// `push segment index`
    Push(Segment, u16),
    /// `pop segment index`
    Pop(Segment, u16),
    /// Operand-less arithmetic and logic.
    Arithmetic(ArithmeticOp),
    /// `label name`
    Label(SmolStr),
    /// `goto name`
    Goto(SmolStr),
    /// `if-goto name`
    /// Pop the top of the stack and jump when it's not zero.
    IfGoto(SmolStr),
    /// `call name nArgs`
    Call(SmolStr, u16),
    /// `function name nLocals`
    Function(SmolStr, u16),
    /// `return`
    Return,
}

/// Outputs the instruction in the VM text protocol.
impl fmt::Display for VmCommand {
    #[rustfmt::skip]
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Push(segment, index)   => write!(f, "push {segment} {index}"),
            Self::Pop(segment, index)    => write!(f, "pop {segment} {index}"),
            Self::Arithmetic(op)         => write!(f, "{op}"),
            Self::Label(name)            => write!(f, "label {name}"),
            Self::Goto(name)             => write!(f, "goto {name}"),
            Self::IfGoto(name)           => write!(f, "if-goto {name}"),
            Self::Call(name, n_args)     => write!(f, "call {name} {n_args}"),
            Self::Function(name, n_locals) => write!(f, "function {name} {n_locals}"),
            Self::Return                 => write!(f, "return"),
        }
    }
}

/// Named storage region addressed by index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Segment {
    Constant,
    Local,
    Argument,
    Static,
    This,
    That,
    /// Index 0 aliases `this`, index 1 aliases `that`.
    Pointer,
    Temp,
}

impl Segment {
    #[rustfmt::skip]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Constant => "constant",
            Self::Local    => "local",
            Self::Argument => "argument",
            Self::Static   => "static",
            Self::This     => "this",
            Self::That     => "that",
            Self::Pointer  => "pointer",
            Self::Temp     => "temp",
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ArithmeticOp {
    Add,
    Sub,
    Neg,
    Eq,
    Gt,
    Lt,
    And,
    Or,
    Not,
}

impl ArithmeticOp {
    /// Native instruction for a binary operator symbol.
    ///
    /// Multiplication and division have no native instruction
    /// and are lowered to runtime library calls instead.
    #[rustfmt::skip]
    pub fn from_binary(symbol: char) -> Option<Self> {
        match symbol {
            '+' => Some(Self::Add),
            '-' => Some(Self::Sub),
            '&' => Some(Self::And),
            '|' => Some(Self::Or),
            '<' => Some(Self::Lt),
            '>' => Some(Self::Gt),
            '=' => Some(Self::Eq),
            _   => None,
        }
    }

    #[rustfmt::skip]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Sub => "sub",
            Self::Neg => "neg",
            Self::Eq  => "eq",
            Self::Gt  => "gt",
            Self::Lt  => "lt",
            Self::And => "and",
            Self::Or  => "or",
            Self::Not => "not",
        }
    }
}

impl fmt::Display for ArithmeticOp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_command_text() {
        assert_eq!(VmCommand::Push(Segment::Constant, 7).to_string(), "push constant 7");
        assert_eq!(VmCommand::Pop(Segment::Pointer, 1).to_string(), "pop pointer 1");
        assert_eq!(VmCommand::Arithmetic(ArithmeticOp::Neg).to_string(), "neg");
        assert_eq!(VmCommand::Label("Main.label0".into()).to_string(), "label Main.label0");
        assert_eq!(VmCommand::Goto("Main.label1".into()).to_string(), "goto Main.label1");
        assert_eq!(VmCommand::IfGoto("Main.label2".into()).to_string(), "if-goto Main.label2");
        assert_eq!(VmCommand::Call("Math.multiply".into(), 2).to_string(), "call Math.multiply 2");
        assert_eq!(VmCommand::Function("Main.main".into(), 3).to_string(), "function Main.main 3");
        assert_eq!(VmCommand::Return.to_string(), "return");
    }

    #[test]
    fn test_binary_operators() {
        assert_eq!(ArithmeticOp::from_binary('='), Some(ArithmeticOp::Eq));
        assert_eq!(ArithmeticOp::from_binary('*'), None);
        assert_eq!(ArithmeticOp::from_binary('/'), None);
    }
}
