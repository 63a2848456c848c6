use std::collections::HashMap;
use std::rc::Rc;

use anyhow::{Result, anyhow, bail};

use crate::ast::{ComparisonOp, Expression, Program, Statement};
use crate::lexer::Lexer;
use crate::runtime::class::{Class, Method};
use crate::token::Token;

const SELF_PARAM: &str = "self";
const STRINGIFY_NAME: &str = "str";

/// Recursive-descent translator from the token cursor to the AST.
///
/// Classes are resolved at parse time: each definition enters the
/// registry, and both `class B(A)` parent references and `Name(...)`
/// instantiations are looked up there.
pub struct Parser {
    lexer: Lexer,
    classes: HashMap<String, Rc<Class>>,
}

impl Parser {
    pub fn new(lexer: Lexer) -> Self {
        Self {
            lexer,
            classes: HashMap::new(),
        }
    }

    pub fn parse_program(mut self) -> Result<Program> {
        let mut statements = Vec::new();
        loop {
            match self.current() {
                Token::Eof => break,
                Token::Newline => {
                    self.advance();
                }
                _ => statements.push(self.parse_statement()?),
            }
        }
        Ok(Program { statements })
    }

    fn parse_statement(&mut self) -> Result<Statement> {
        match self.current() {
            Token::Class => self.parse_class_definition(),
            Token::If => self.parse_if_else(),
            Token::Print => self.parse_print(),
            Token::Return => self.parse_return(),
            _ => self.parse_assignment_or_expression(),
        }
    }

    fn parse_class_definition(&mut self) -> Result<Statement> {
        self.advance(); // class
        let name = self.expect_id()?;
        let parent = if *self.current() == Token::Char('(') {
            self.advance();
            let parent_name = self.expect_id()?;
            self.expect_char(')')?;
            Some(self.lookup_class(&parent_name)?)
        } else {
            None
        };
        self.expect_char(':')?;
        self.expect_newline()?;
        self.expect_indent()?;

        let mut methods = Vec::new();
        while *self.current() == Token::Def {
            methods.push(self.parse_method()?);
        }
        self.expect_dedent()?;

        let class = Rc::new(Class::new(name.clone(), methods, parent));
        self.classes.insert(name, Rc::clone(&class));
        Ok(Statement::ClassDefinition(class))
    }

    fn parse_method(&mut self) -> Result<Method> {
        self.advance(); // def
        let name = self.expect_id()?;
        self.expect_char('(')?;
        let receiver = self.expect_id()?;
        if receiver != SELF_PARAM {
            bail!("Expected '{SELF_PARAM}' as the first method parameter, got '{receiver}'");
        }
        let mut formal_params = Vec::new();
        while *self.current() == Token::Char(',') {
            self.advance();
            formal_params.push(self.expect_id()?);
        }
        self.expect_char(')')?;
        let body = self.parse_suite()?;
        Ok(Method {
            name,
            formal_params,
            body: Statement::MethodBody(Box::new(body)),
        })
    }

    // ": NEWLINE INDENT statement+ DEDENT", returned as a Compound.
    fn parse_suite(&mut self) -> Result<Statement> {
        self.expect_char(':')?;
        self.expect_newline()?;
        self.expect_indent()?;
        let mut statements = Vec::new();
        while !matches!(self.current(), Token::Dedent | Token::Eof) {
            statements.push(self.parse_statement()?);
        }
        self.expect_dedent()?;
        Ok(Statement::Compound(statements))
    }

    fn parse_if_else(&mut self) -> Result<Statement> {
        self.advance(); // if
        let condition = self.parse_expression()?;
        let if_body = self.parse_suite()?;
        let else_body = if *self.current() == Token::Else {
            self.advance();
            Some(Box::new(self.parse_suite()?))
        } else {
            None
        };
        Ok(Statement::IfElse {
            condition,
            if_body: Box::new(if_body),
            else_body,
        })
    }

    fn parse_print(&mut self) -> Result<Statement> {
        self.advance(); // print
        let mut args = Vec::new();
        if !self.at_end_of_line() {
            args.push(self.parse_expression()?);
            while *self.current() == Token::Char(',') {
                self.advance();
                args.push(self.parse_expression()?);
            }
        }
        self.expect_end_of_line()?;
        Ok(Statement::Print { args })
    }

    fn parse_return(&mut self) -> Result<Statement> {
        self.advance(); // return
        let value = self.parse_expression()?;
        self.expect_end_of_line()?;
        Ok(Statement::Return(value))
    }

    // A statement that starts with an identifier is an assignment when the
    // dotted target is followed by '='; anything else continues as a plain
    // expression with the already-parsed name as its leftmost operand.
    fn parse_assignment_or_expression(&mut self) -> Result<Statement> {
        let statement = if matches!(self.current(), Token::Id(_)) {
            let dotted_ids = self.parse_dotted_ids()?;
            if *self.current() == Token::Char('=') {
                self.advance();
                let rv = self.parse_expression()?;
                Self::assignment_statement(dotted_ids, rv)?
            } else {
                let name = self.parse_name_continuation(dotted_ids)?;
                Statement::Expr(self.parse_expression_from(name)?)
            }
        } else {
            Statement::Expr(self.parse_expression()?)
        };
        self.expect_end_of_line()?;
        Ok(statement)
    }

    fn assignment_statement(mut dotted_ids: Vec<String>, rv: Expression) -> Result<Statement> {
        let Some(last) = dotted_ids.pop() else {
            bail!("Assignment target is empty");
        };
        if dotted_ids.is_empty() {
            Ok(Statement::Assignment { var: last, rv })
        } else {
            Ok(Statement::FieldAssignment {
                object: dotted_ids,
                field_name: last,
                rv,
            })
        }
    }

    fn parse_expression(&mut self) -> Result<Expression> {
        let operand = self.parse_or_operand()?;
        self.parse_or_rest(operand)
    }

    // Continues binary parsing with an operand that is already in hand.
    fn parse_expression_from(&mut self, primary: Expression) -> Result<Expression> {
        let operand = self.parse_postfix_calls(primary)?;
        let operand = self.parse_term_rest(operand)?;
        let operand = self.parse_additive_rest(operand)?;
        let operand = self.parse_comparison_rest(operand)?;
        let operand = self.parse_and_rest(operand)?;
        self.parse_or_rest(operand)
    }

    fn parse_or_operand(&mut self) -> Result<Expression> {
        let operand = self.parse_and_operand()?;
        self.parse_and_rest(operand)
    }

    fn parse_or_rest(&mut self, mut lhs: Expression) -> Result<Expression> {
        while *self.current() == Token::Or {
            self.advance();
            let rhs = self.parse_or_operand()?;
            lhs = Expression::Or {
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn parse_and_operand(&mut self) -> Result<Expression> {
        if *self.current() == Token::Not {
            self.advance();
            return Ok(Expression::Not(Box::new(self.parse_and_operand()?)));
        }
        let operand = self.parse_comparison_operand()?;
        self.parse_comparison_rest(operand)
    }

    fn parse_and_rest(&mut self, mut lhs: Expression) -> Result<Expression> {
        while *self.current() == Token::And {
            self.advance();
            let rhs = self.parse_and_operand()?;
            lhs = Expression::And {
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn parse_comparison_operand(&mut self) -> Result<Expression> {
        let operand = self.parse_additive_operand()?;
        self.parse_additive_rest(operand)
    }

    // A single, non-associative comparison.
    fn parse_comparison_rest(&mut self, lhs: Expression) -> Result<Expression> {
        let op = match self.current() {
            Token::Eq => ComparisonOp::Eq,
            Token::NotEq => ComparisonOp::NotEq,
            Token::LessOrEq => ComparisonOp::LessOrEq,
            Token::GreaterOrEq => ComparisonOp::GreaterOrEq,
            Token::Char('<') => ComparisonOp::Less,
            Token::Char('>') => ComparisonOp::Greater,
            _ => return Ok(lhs),
        };
        self.advance();
        let rhs = self.parse_comparison_operand()?;
        Ok(Expression::Comparison {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        })
    }

    fn parse_additive_operand(&mut self) -> Result<Expression> {
        let operand = self.parse_primary()?;
        self.parse_term_rest(operand)
    }

    fn parse_additive_rest(&mut self, mut lhs: Expression) -> Result<Expression> {
        loop {
            match self.current() {
                Token::Char('+') => {
                    self.advance();
                    let rhs = self.parse_additive_operand()?;
                    lhs = Expression::Add {
                        lhs: Box::new(lhs),
                        rhs: Box::new(rhs),
                    };
                }
                Token::Char('-') => {
                    self.advance();
                    let rhs = self.parse_additive_operand()?;
                    lhs = Expression::Sub {
                        lhs: Box::new(lhs),
                        rhs: Box::new(rhs),
                    };
                }
                _ => return Ok(lhs),
            }
        }
    }

    fn parse_term_rest(&mut self, mut lhs: Expression) -> Result<Expression> {
        loop {
            match self.current() {
                Token::Char('*') => {
                    self.advance();
                    let rhs = self.parse_primary()?;
                    lhs = Expression::Mult {
                        lhs: Box::new(lhs),
                        rhs: Box::new(rhs),
                    };
                }
                Token::Char('/') => {
                    self.advance();
                    let rhs = self.parse_primary()?;
                    lhs = Expression::Div {
                        lhs: Box::new(lhs),
                        rhs: Box::new(rhs),
                    };
                }
                _ => return Ok(lhs),
            }
        }
    }

    fn parse_primary(&mut self) -> Result<Expression> {
        let expression = match self.current().clone() {
            Token::Number(value) => {
                self.advance();
                Expression::Number(value)
            }
            Token::String(value) => {
                self.advance();
                Expression::String(value)
            }
            Token::True => {
                self.advance();
                Expression::Bool(true)
            }
            Token::False => {
                self.advance();
                Expression::Bool(false)
            }
            Token::None => {
                self.advance();
                Expression::None
            }
            Token::Char('(') => {
                self.advance();
                let inner = self.parse_expression()?;
                self.expect_char(')')?;
                inner
            }
            Token::Id(_) => {
                let dotted_ids = self.parse_dotted_ids()?;
                self.parse_name_continuation(dotted_ids)?
            }
            other => bail!("Expected an expression, got {other}"),
        };
        self.parse_postfix_calls(expression)
    }

    // Id ("." Id)*
    fn parse_dotted_ids(&mut self) -> Result<Vec<String>> {
        let mut dotted_ids = vec![self.expect_id()?];
        while *self.current() == Token::Char('.') {
            self.advance();
            dotted_ids.push(self.expect_id()?);
        }
        Ok(dotted_ids)
    }

    // A dotted name becomes a variable read, an instantiation, a method
    // call or the str(...) conversion, depending on what follows it.
    fn parse_name_continuation(&mut self, mut dotted_ids: Vec<String>) -> Result<Expression> {
        if *self.current() != Token::Char('(') {
            return Ok(Expression::Variable { dotted_ids });
        }
        let args = self.parse_call_args()?;
        match dotted_ids.pop() {
            Some(method) if !dotted_ids.is_empty() => Ok(Expression::MethodCall {
                object: Box::new(Expression::Variable { dotted_ids }),
                method,
                args,
            }),
            Some(name) => {
                if let Some(class) = self.classes.get(&name) {
                    Ok(Expression::NewInstance {
                        class: Rc::clone(class),
                        args,
                    })
                } else if name == STRINGIFY_NAME {
                    let mut args = args;
                    match (args.pop(), args.pop()) {
                        (Some(argument), None) => Ok(Expression::Stringify(Box::new(argument))),
                        _ => bail!("'{STRINGIFY_NAME}' takes exactly one argument"),
                    }
                } else {
                    bail!("Unknown class '{name}'")
                }
            }
            None => bail!("Call target is empty"),
        }
    }

    fn parse_call_args(&mut self) -> Result<Vec<Expression>> {
        self.expect_char('(')?;
        let mut args = Vec::new();
        if *self.current() != Token::Char(')') {
            args.push(self.parse_expression()?);
            while *self.current() == Token::Char(',') {
                self.advance();
                args.push(self.parse_expression()?);
            }
        }
        self.expect_char(')')?;
        Ok(args)
    }

    fn parse_postfix_calls(&mut self, mut expression: Expression) -> Result<Expression> {
        while *self.current() == Token::Char('.') {
            self.advance();
            let method = self.expect_id()?;
            let args = self.parse_call_args()?;
            expression = Expression::MethodCall {
                object: Box::new(expression),
                method,
                args,
            };
        }
        Ok(expression)
    }

    fn current(&self) -> &Token {
        self.lexer.current_token()
    }

    fn advance(&mut self) {
        self.lexer.next_token();
    }

    fn expect_id(&mut self) -> Result<String> {
        match self.current() {
            Token::Id(name) => {
                let name = name.clone();
                self.advance();
                Ok(name)
            }
            other => Err(anyhow!("Expected an identifier, got {other}")),
        }
    }

    fn expect_char(&mut self, expected: char) -> Result<()> {
        if *self.current() == Token::Char(expected) {
            self.advance();
            Ok(())
        } else {
            Err(anyhow!("Expected '{expected}', got {}", self.current()))
        }
    }

    fn expect_newline(&mut self) -> Result<()> {
        if *self.current() == Token::Newline {
            self.advance();
            Ok(())
        } else {
            Err(anyhow!("Expected a newline, got {}", self.current()))
        }
    }

    fn expect_indent(&mut self) -> Result<()> {
        if *self.current() == Token::Indent {
            self.advance();
            Ok(())
        } else {
            Err(anyhow!("Expected an indented block, got {}", self.current()))
        }
    }

    fn expect_dedent(&mut self) -> Result<()> {
        if *self.current() == Token::Dedent {
            self.advance();
            Ok(())
        } else {
            Err(anyhow!("Expected the block to end, got {}", self.current()))
        }
    }

    fn at_end_of_line(&self) -> bool {
        matches!(self.current(), Token::Newline | Token::Dedent | Token::Eof)
    }

    // A statement ends at a newline (consumed here) or right before the
    // dedent or end of input the lexer produced for its line.
    fn expect_end_of_line(&mut self) -> Result<()> {
        match self.current() {
            Token::Newline => {
                self.advance();
                Ok(())
            }
            Token::Dedent | Token::Eof => Ok(()),
            other => Err(anyhow!("Expected end of line, got {other}")),
        }
    }

    fn lookup_class(&self, name: &str) -> Result<Rc<Class>> {
        self.classes
            .get(name)
            .cloned()
            .ok_or_else(|| anyhow!("Unknown class '{name}'"))
    }
}

pub fn parse(source: &str) -> Result<Program> {
    let lexer = Lexer::new(source)?;
    Parser::new(lexer).parse_program()
}
