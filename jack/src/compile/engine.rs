//! Recursive descent parser fused with code generation.
use log::{debug, trace};
use smol_str::SmolStr;

use super::{
    ir::{ArithmeticOp, Segment, VmCommand},
    symbol::{Symbol, SymbolKind, SymbolTable},
};
use crate::{
    error::{JackError, JackResult},
    lex::{Keyword, Lexer, Token, TokenKind, TokenStream, MAX_INTEGER},
};

/// Operators allowed between the terms of an expression.
///
/// There is no precedence, operators apply left to right.
const BINARY_OPERATORS: [char; 9] = ['+', '-', '*', '/', '&', '|', '<', '>', '='];

/// Scratch slot used to hand values between two adjacent instructions.
const TEMP_SCRATCH: u16 = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubroutineKind {
    Constructor,
    Function,
    Method,
}

/// Compiles one class from tokens straight to VM commands.
///
/// Grammar rules validate the token stream and emit instructions
/// inline, so no syntax tree is ever built. The parser relies on
/// a single token of look ahead.
pub struct CompilationEngine<'a> {
    input: TokenStream<'a>,
    symbols: SymbolTable,
    /// Resulting generated code.
    code: Vec<VmCommand>,
    class_name: SmolStr,
    /// Number of `field` declarations, which is the
    /// allocation size of an instance.
    field_count: u16,
    subroutine_kind: SubroutineKind,
    /// When set, `return;` pushes an implicit zero.
    void_subroutine: bool,
    /// Monotonically increasing counter for unique label names.
    label_index: u32,
}

impl<'a> CompilationEngine<'a> {
    pub fn new(lexer: Lexer<'a>) -> Self {
        Self {
            input: TokenStream::new(lexer),
            symbols: SymbolTable::new(),
            code: vec![],
            class_name: SmolStr::default(),
            field_count: 0,
            subroutine_kind: SubroutineKind::Function,
            void_subroutine: false,
            label_index: 0,
        }
    }

    /// Compile the single class in the source.
    ///
    /// The first error aborts compilation, and nothing
    /// generated so far is returned.
    pub fn compile_class(mut self) -> JackResult<Vec<VmCommand>> {
        self.input.consume_keyword(&[Keyword::Class])?;
        let (class_name, _) = self.input.consume_identifier()?;
        debug!("compiling class {class_name}");
        self.class_name = class_name;

        self.input.consume_symbol(&['{'])?;

        while self.input.is_keyword(&[Keyword::Field, Keyword::Static])? {
            self.compile_class_var_dec()?;
        }

        while !self.input.is_symbol(&['}'])? {
            self.compile_subroutine()?;
        }

        self.input.consume_symbol(&['}'])?;

        if self.input.has_more_tokens()? {
            return Err(self.input.mismatch("end of file after class body"));
        }

        Ok(self.code)
    }
}

/// Declarations
impl<'a> CompilationEngine<'a> {
    /// `('static' | 'field') type name (',' name)* ';'`
    fn compile_class_var_dec(&mut self) -> JackResult<()> {
        let kind = match self.input.consume_keyword(&[Keyword::Static, Keyword::Field])? {
            Keyword::Field => SymbolKind::Field,
            _ => SymbolKind::Static,
        };

        let loc = self.input.location()?;
        let count = self.compile_var_names(kind)?;
        if kind == SymbolKind::Field {
            // Instance size is pushed as a constant by constructors.
            self.field_count = self
                .field_count
                .checked_add(count)
                .filter(|size| *size <= MAX_INTEGER)
                .ok_or_else(|| {
                    let message = format!("class {} declares more than {MAX_INTEGER} fields", self.class_name);
                    JackError::semantic(loc, message)
                })?;
        }

        Ok(())
    }

    /// `type name (',' name)* ';'`
    ///
    /// Defines each name with the given kind and returns
    /// the number of names declared.
    fn compile_var_names(&mut self, kind: SymbolKind) -> JackResult<u16> {
        let ty = self.input.consume_type(false)?;
        let mut count = 0;

        loop {
            let (name, token) = self.input.consume_identifier()?;
            self.define(name, ty.clone(), kind, &token)?;
            count += 1;

            if self.input.consume_symbol(&[',', ';'])? == ';' {
                break;
            }
        }

        Ok(count)
    }

    /// `('constructor' | 'function' | 'method') ('void' | type) name '(' parameters ')' body`
    fn compile_subroutine(&mut self) -> JackResult<()> {
        self.symbols.start_subroutine();

        let kind = match self
            .input
            .consume_keyword(&[Keyword::Constructor, Keyword::Function, Keyword::Method])?
        {
            Keyword::Constructor => SubroutineKind::Constructor,
            Keyword::Method => SubroutineKind::Method,
            _ => SubroutineKind::Function,
        };

        // The receiver is passed as a hidden first argument.
        if kind == SubroutineKind::Method {
            let loc = self.input.location()?;
            self.symbols
                .define("this", self.class_name.clone(), SymbolKind::Argument)
                .map_err(|err| JackError::semantic(loc, err))?;
        }

        let return_ty = self.input.consume_type(true)?;
        let (name, _) = self.input.consume_identifier()?;
        debug!("compiling {kind:?} {}.{name}", self.class_name);

        self.input.consume_symbol(&['('])?;
        self.compile_parameter_list()?;
        self.input.consume_symbol(&[')'])?;

        // Body
        self.input.consume_symbol(&['{'])?;

        let mut local_count = 0;
        while self.input.is_keyword(&[Keyword::Var])? {
            self.input.consume_keyword(&[Keyword::Var])?;
            local_count += self.compile_var_names(SymbolKind::Local)?;
        }

        let function_name = SmolStr::from(format!("{}.{name}", self.class_name));
        self.emit(VmCommand::Function(function_name, local_count));

        match kind {
            SubroutineKind::Constructor => {
                // Allocate the object and point `this` at it.
                self.push(Segment::Constant, self.field_count);
                self.call("Memory.alloc", 1);
                self.pop(Segment::Pointer, 0);
            }
            SubroutineKind::Method => {
                self.push(Segment::Argument, 0);
                self.pop(Segment::Pointer, 0);
            }
            SubroutineKind::Function => {}
        }

        self.subroutine_kind = kind;
        self.void_subroutine = return_ty == Keyword::Void.as_str();
        self.compile_statements()?;
        self.void_subroutine = false;

        self.input.consume_symbol(&['}'])?;

        Ok(())
    }

    /// `((type name) (',' type name)*)?`
    fn compile_parameter_list(&mut self) -> JackResult<()> {
        if self.input.is_symbol(&[')'])? {
            return Ok(());
        }

        loop {
            let ty = self.input.consume_type(false)?;
            let (name, token) = self.input.consume_identifier()?;
            self.define(name, ty, SymbolKind::Argument, &token)?;

            if !self.input.match_symbol(',')? {
                return Ok(());
            }
        }
    }
}

/// Statements
impl<'a> CompilationEngine<'a> {
    fn compile_statements(&mut self) -> JackResult<()> {
        while let Some(keyword) = self.input.peek_keyword()? {
            match keyword {
                Keyword::Let => self.compile_let()?,
                Keyword::If => self.compile_if()?,
                Keyword::While => self.compile_while()?,
                Keyword::Do => self.compile_do()?,
                Keyword::Return => self.compile_return()?,
                _ => break,
            }
        }

        Ok(())
    }

    /// `'let' name ('[' expression ']')? '=' expression ';'`
    fn compile_let(&mut self) -> JackResult<()> {
        self.input.consume_keyword(&[Keyword::Let])?;
        let (name, token) = self.input.consume_identifier()?;

        let symbol = match self.symbols.get(&name) {
            Some(symbol) => symbol.clone(),
            None => {
                return Err(JackError::semantic(
                    &token.span,
                    format!("cannot assign to undeclared variable '{name}'"),
                ))
            }
        };

        if self.input.match_symbol('[')? {
            self.check_indexable(&symbol, &token)?;

            // Element address
            self.push_symbol(&symbol);
            self.compile_expression()?;
            self.input.consume_symbol(&[']'])?;
            self.arithmetic(ArithmeticOp::Add);

            // The address stays on the stack while the right hand side
            // is evaluated, which may itself redirect `that` or call
            // subroutines that use the temp segment.
            self.input.consume_symbol(&['='])?;
            self.compile_expression()?;
            self.input.consume_symbol(&[';'])?;

            self.pop(Segment::Temp, TEMP_SCRATCH);
            self.pop(Segment::Pointer, 1);
            self.push(Segment::Temp, TEMP_SCRATCH);
            self.pop(Segment::That, 0);
        } else {
            self.input.consume_symbol(&['='])?;
            self.compile_expression()?;
            self.input.consume_symbol(&[';'])?;

            self.pop(symbol.segment(), symbol.index);
        }

        Ok(())
    }

    /// `'if' '(' expression ')' '{' statements '}' ('else' '{' statements '}')?`
    fn compile_if(&mut self) -> JackResult<()> {
        self.input.consume_keyword(&[Keyword::If])?;

        self.input.consume_symbol(&['('])?;
        self.compile_expression()?;
        self.input.consume_symbol(&[')'])?;

        let else_label = self.next_label();
        self.arithmetic(ArithmeticOp::Not);
        self.emit(VmCommand::IfGoto(else_label.clone()));

        self.compile_block()?;

        if self.input.is_keyword(&[Keyword::Else])? {
            self.input.consume_keyword(&[Keyword::Else])?;

            let end_label = self.next_label();
            self.emit(VmCommand::Goto(end_label.clone()));
            self.emit(VmCommand::Label(else_label));

            self.compile_block()?;

            self.emit(VmCommand::Label(end_label));
        } else {
            self.emit(VmCommand::Label(else_label));
        }

        Ok(())
    }

    /// `'while' '(' expression ')' '{' statements '}'`
    fn compile_while(&mut self) -> JackResult<()> {
        let top_label = self.next_label();
        let end_label = self.next_label();

        self.input.consume_keyword(&[Keyword::While])?;
        self.emit(VmCommand::Label(top_label.clone()));

        self.input.consume_symbol(&['('])?;
        self.compile_expression()?;
        self.input.consume_symbol(&[')'])?;

        self.arithmetic(ArithmeticOp::Not);
        self.emit(VmCommand::IfGoto(end_label.clone()));

        self.compile_block()?;

        self.emit(VmCommand::Goto(top_label));
        self.emit(VmCommand::Label(end_label));

        Ok(())
    }

    /// `'do' subroutineCall ';'`
    fn compile_do(&mut self) -> JackResult<()> {
        self.input.consume_keyword(&[Keyword::Do])?;

        let (name, token) = self.input.consume_identifier()?;
        self.compile_subroutine_call(name, &token)?;
        self.input.consume_symbol(&[';'])?;

        // Discard the return value.
        self.pop(Segment::Temp, TEMP_SCRATCH);

        Ok(())
    }

    /// `'return' expression? ';'`
    fn compile_return(&mut self) -> JackResult<()> {
        self.input.consume_keyword(&[Keyword::Return])?;

        if !self.input.is_symbol(&[';'])? {
            self.compile_expression()?;
        } else if self.void_subroutine {
            // Calling convention always returns exactly one value.
            self.push(Segment::Constant, 0);
        }

        self.input.consume_symbol(&[';'])?;
        self.emit(VmCommand::Return);

        Ok(())
    }

    /// `'{' statements '}'`
    fn compile_block(&mut self) -> JackResult<()> {
        self.input.consume_symbol(&['{'])?;
        self.compile_statements()?;
        self.input.consume_symbol(&['}'])?;
        Ok(())
    }
}

/// Expressions
impl<'a> CompilationEngine<'a> {
    /// `term (op term)*`
    fn compile_expression(&mut self) -> JackResult<()> {
        self.compile_term()?;

        while let Some(symbol) = self.input.peek_symbol()? {
            if !BINARY_OPERATORS.contains(&symbol) {
                break;
            }
            self.input.next_token()?;
            self.compile_term()?;

            match symbol {
                '*' => self.call("Math.multiply", 2),
                '/' => self.call("Math.divide", 2),
                _ => match ArithmeticOp::from_binary(symbol) {
                    Some(op) => self.arithmetic(op),
                    None => unreachable!("binary operator without native instruction: {symbol}"),
                },
            }
        }

        Ok(())
    }

    fn compile_term(&mut self) -> JackResult<()> {
        let token = self.input.next_token()?;

        match token.kind {
            TokenKind::IntegerConstant(value) => self.push(Segment::Constant, value),
            TokenKind::StringConstant(ref value) => self.compile_string(value),
            TokenKind::Keyword(Keyword::True) => {
                // All bits set.
                self.push(Segment::Constant, 1);
                self.arithmetic(ArithmeticOp::Neg);
            }
            TokenKind::Keyword(Keyword::False) | TokenKind::Keyword(Keyword::Null) => {
                self.push(Segment::Constant, 0);
            }
            TokenKind::Keyword(Keyword::This) => self.push(Segment::Pointer, 0),
            TokenKind::Symbol('(') => {
                self.compile_expression()?;
                self.input.consume_symbol(&[')'])?;
            }
            TokenKind::Symbol('-') => {
                self.compile_term()?;
                self.arithmetic(ArithmeticOp::Neg);
            }
            TokenKind::Symbol('~') => {
                self.compile_term()?;
                self.arithmetic(ArithmeticOp::Not);
            }
            TokenKind::Identifier(ref name) => {
                let name = name.clone();
                match self.input.peek_symbol()? {
                    Some('.') | Some('(') => self.compile_subroutine_call(name, &token)?,
                    Some('[') => self.compile_array_access(name, &token)?,
                    _ => {
                        let symbol = self.lookup(&name, &token)?;
                        self.push_symbol(&symbol);
                    }
                }
            }
            ref kind => {
                return Err(JackError::syntax(
                    &token.span,
                    format!("expected expression, found '{kind}'"),
                ))
            }
        }

        Ok(())
    }

    /// `name '[' expression ']'`, with the name already consumed.
    fn compile_array_access(&mut self, name: SmolStr, token: &Token) -> JackResult<()> {
        let symbol = self.lookup(&name, token)?;
        self.check_indexable(&symbol, token)?;

        self.push_symbol(&symbol);
        self.input.consume_symbol(&['['])?;
        self.compile_expression()?;
        self.input.consume_symbol(&[']'])?;
        self.arithmetic(ArithmeticOp::Add);

        self.pop(Segment::Pointer, 1);
        self.push(Segment::That, 0);

        Ok(())
    }

    /// String constants are built at runtime, one character at a time.
    fn compile_string(&mut self, value: &str) {
        self.push(Segment::Constant, value.chars().count() as u16);
        self.call("String.new", 1);

        for c in value.chars() {
            self.push(Segment::Constant, c as u16);
            self.call("String.appendChar", 2);
        }
    }

    /// `name '(' expressions ')' | name '.' name '(' expressions ')'`
    ///
    /// The first name is already consumed.
    fn compile_subroutine_call(&mut self, name: SmolStr, token: &Token) -> JackResult<()> {
        let (target, receiver_count) = if self.input.match_symbol('.')? {
            let (subroutine_name, _) = self.input.consume_identifier()?;

            match self.symbols.get(&name).cloned() {
                Some(symbol) => {
                    // Method call on an object held by a variable.
                    if Keyword::parse(symbol.ty.as_str()).map_or(false, |k| k.is_primitive_type()) {
                        return Err(JackError::semantic(
                            &token.span,
                            format!(
                                "cannot call method '{subroutine_name}' on '{name}' of primitive type {}",
                                symbol.ty
                            ),
                        ));
                    }
                    self.push_symbol(&symbol);
                    (format!("{}.{subroutine_name}", symbol.ty), 1)
                }
                // Function or constructor of another class.
                None => (format!("{name}.{subroutine_name}"), 0),
            }
        } else {
            match self.subroutine_kind {
                SubroutineKind::Method | SubroutineKind::Constructor => {
                    // Method call on the current object.
                    self.push(Segment::Pointer, 0);
                    (format!("{}.{name}", self.class_name), 1)
                }
                SubroutineKind::Function => (format!("{}.{name}", self.class_name), 0),
            }
        };

        self.input.consume_symbol(&['('])?;
        let arg_count = self.compile_expression_list()?;
        self.input.consume_symbol(&[')'])?;

        self.call(target, arg_count + receiver_count);

        Ok(())
    }

    /// `(expression (',' expression)*)?`
    ///
    /// Returns the number of expressions compiled.
    fn compile_expression_list(&mut self) -> JackResult<u16> {
        if self.input.is_symbol(&[')'])? {
            return Ok(0);
        }

        let mut count = 0;
        loop {
            self.compile_expression()?;
            count += 1;

            if !self.input.match_symbol(',')? {
                return Ok(count);
            }
        }
    }
}

/// Symbols
impl<'a> CompilationEngine<'a> {
    fn define(&mut self, name: SmolStr, ty: SmolStr, kind: SymbolKind, token: &Token) -> JackResult<()> {
        self.symbols
            .define(name, ty, kind)
            .map(|_| ())
            .map_err(|err| JackError::semantic(&token.span, err))
    }

    fn lookup(&self, name: &str, token: &Token) -> JackResult<Symbol> {
        self.symbols
            .lookup(name)
            .cloned()
            .map_err(|err| JackError::semantic(&token.span, err))
    }

    fn check_indexable(&self, symbol: &Symbol, token: &Token) -> JackResult<()> {
        if symbol.ty == "Array" {
            Ok(())
        } else {
            Err(JackError::semantic(
                &token.span,
                format!("'{}' of type {} can't be indexed, expected Array", symbol.name, symbol.ty),
            ))
        }
    }
}

/// Emitter
impl<'a> CompilationEngine<'a> {
    fn emit(&mut self, command: VmCommand) {
        trace!("{command}");
        self.code.push(command);
    }

    #[inline]
    fn push(&mut self, segment: Segment, index: u16) {
        self.emit(VmCommand::Push(segment, index));
    }

    #[inline]
    fn pop(&mut self, segment: Segment, index: u16) {
        self.emit(VmCommand::Pop(segment, index));
    }

    #[inline]
    fn push_symbol(&mut self, symbol: &Symbol) {
        self.push(symbol.segment(), symbol.index);
    }

    #[inline]
    fn arithmetic(&mut self, op: ArithmeticOp) {
        self.emit(VmCommand::Arithmetic(op));
    }

    #[inline]
    fn call(&mut self, name: impl Into<SmolStr>, arg_count: u16) {
        self.emit(VmCommand::Call(name.into(), arg_count));
    }

    /// Unique label within the class, `<class>.label<N>`.
    fn next_label(&mut self) -> SmolStr {
        let label = SmolStr::from(format!("{}.label{}", self.class_name, self.label_index));
        self.label_index += 1;
        label
    }
}
