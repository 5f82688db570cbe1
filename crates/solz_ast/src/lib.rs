use serde::Serialize;
use solz_lexer::Pos;

/// A complete Solidity source file
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Program {
    pub pragma: Option<PragmaDirective>,
    pub imports: Vec<ImportDirective>,
    pub contracts: Vec<ContractPart>,
}

/// An identifier occurrence with its own position
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Ident {
    pub name: String,
    pub pos: Pos,
}

impl Ident {
    pub fn new(name: impl Into<String>, pos: Pos) -> Self {
        Self {
            name: name.into(),
            pos,
        }
    }
}

/// `pragma solidity ^0.4.23;`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PragmaDirective {
    pub name: Ident,
    /// Token literals concatenated without separators (`^0.4.23`)
    pub value: String,
}

/// `import "path";` (path kept verbatim, quotes included)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportDirective {
    pub path: String,
}

/// A contract declaration
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContractPart {
    pub name: Ident,
    /// Names listed after `is`
    pub inherits: Vec<Ident>,
    pub state_variables: Vec<StateVariableDeclaration>,
    pub functions: Vec<FunctionDefinition>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Visibility {
    Public,
    Internal,
    Private,
}

impl Visibility {
    pub fn from_keyword(word: &str) -> Option<Self> {
        match word {
            "public" => Some(Visibility::Public),
            "internal" => Some(Visibility::Internal),
            "private" => Some(Visibility::Private),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Visibility::Public => "public",
            Visibility::Internal => "internal",
            Visibility::Private => "private",
        }
    }
}

/// `uint256 public constant NAME = expr;`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StateVariableDeclaration {
    pub ty: Ident,
    /// `None` when no visibility keyword was written
    pub visibility: Option<Visibility>,
    pub is_constant: bool,
    pub name: Ident,
    pub rhs: Expr,
}

/// A function or constructor; the body is a flat list of expression statements
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunctionDefinition {
    pub name: Ident,
    pub visibility: Visibility,
    pub body: Vec<Expr>,
}

/// Expressions
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Expr {
    Ident(Ident),
    BasicLit(BasicLit),
    Binary(BinaryExpr),
    Call(CallExpr),
    Index(IndexExpr),
    Selector(SelectorExpr),
    Paren(ParenExpr),
}

impl Expr {
    /// Position of the first token of the expression
    pub fn pos(&self) -> Pos {
        match self {
            Expr::Ident(ident) => ident.pos,
            Expr::BasicLit(lit) => lit.pos,
            Expr::Binary(binary) => binary.left.pos(),
            Expr::Call(call) => call.callee.pos(),
            Expr::Index(index) => index.base.pos(),
            Expr::Selector(selector) => selector.base.pos(),
            Expr::Paren(paren) => paren.lparen,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LitKind {
    Int,
    String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BasicLit {
    pub kind: LitKind,
    /// Literal text as written; strings keep their quotes
    pub value: String,
    pub pos: Pos,
}

/// Binary operators. All four share one precedence level and group to the right.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BinOp {
    Assign,
    Add,
    Mul,
    Pow,
}

impl BinOp {
    pub fn as_str(self) -> &'static str {
        match self {
            BinOp::Assign => "=",
            BinOp::Add => "+",
            BinOp::Mul => "*",
            BinOp::Pow => "**",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BinaryExpr {
    pub left: Box<Expr>,
    pub op: BinOp,
    pub op_pos: Pos,
    pub right: Box<Expr>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CallExpr {
    pub callee: Box<Expr>,
    pub args: Vec<Expr>,
    pub lparen: Pos,
    pub rparen: Pos,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexExpr {
    pub base: Box<Expr>,
    pub index: Box<Expr>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectorExpr {
    pub base: Box<Expr>,
    pub member: Ident,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParenExpr {
    pub lparen: Pos,
    pub inner: Box<Expr>,
}

// ============================================================================
// Pretty printing
// ============================================================================

impl Program {
    pub fn pretty_print(&self) -> String {
        let mut out = String::new();
        if let Some(pragma) = &self.pragma {
            out.push_str(&format!(
                "Pragma {} {} @{}\n",
                pragma.name.name, pragma.value, pragma.name.pos
            ));
        }
        for import in &self.imports {
            out.push_str(&format!("Import {}\n", import.path));
        }
        for contract in &self.contracts {
            out.push_str(&contract.pretty_print(0));
        }
        out
    }
}

impl ContractPart {
    pub fn pretty_print(&self, indent: usize) -> String {
        let ind = "  ".repeat(indent);
        let mut out = format!("{}Contract {} @{}", ind, self.name.name, self.name.pos);
        if !self.inherits.is_empty() {
            let names: Vec<_> = self
                .inherits
                .iter()
                .map(|i| format!("{} @{}", i.name, i.pos))
                .collect();
            out.push_str(&format!(" is {}", names.join(", ")));
        }
        out.push('\n');
        for var in &self.state_variables {
            out.push_str(&var.pretty_print(indent + 1));
        }
        for func in &self.functions {
            out.push_str(&func.pretty_print(indent + 1));
        }
        out
    }
}

impl StateVariableDeclaration {
    pub fn pretty_print(&self, indent: usize) -> String {
        let ind = "  ".repeat(indent);
        let mut out = format!("{}StateVariable {} {}", ind, self.ty.name, self.name.name);
        if let Some(visibility) = self.visibility {
            out.push_str(&format!(" {}", visibility.as_str()));
        }
        if self.is_constant {
            out.push_str(" constant");
        }
        out.push_str(&format!(" @{}\n", self.name.pos));
        out.push_str(&self.rhs.pretty_print(indent + 1));
        out
    }
}

impl FunctionDefinition {
    pub fn pretty_print(&self, indent: usize) -> String {
        let ind = "  ".repeat(indent);
        let mut out = format!(
            "{}Function {} {} @{}\n",
            ind,
            self.name.name,
            self.visibility.as_str(),
            self.name.pos
        );
        for expr in &self.body {
            out.push_str(&expr.pretty_print(indent + 1));
        }
        out
    }
}

impl Expr {
    pub fn pretty_print(&self, indent: usize) -> String {
        let ind = "  ".repeat(indent);
        match self {
            Expr::Ident(ident) => format!("{}Ident {} @{}\n", ind, ident.name, ident.pos),
            Expr::BasicLit(lit) => {
                let kind = match lit.kind {
                    LitKind::Int => "Int",
                    LitKind::String => "String",
                };
                format!("{}{} {} @{}\n", ind, kind, lit.value, lit.pos)
            }
            Expr::Binary(binary) => {
                let mut out = format!("{}Binary {} @{}\n", ind, binary.op.as_str(), binary.op_pos);
                out.push_str(&binary.left.pretty_print(indent + 1));
                out.push_str(&binary.right.pretty_print(indent + 1));
                out
            }
            Expr::Call(call) => {
                let mut out = format!("{}Call @{}..{}\n", ind, call.lparen, call.rparen);
                out.push_str(&call.callee.pretty_print(indent + 1));
                for arg in &call.args {
                    out.push_str(&arg.pretty_print(indent + 1));
                }
                out
            }
            Expr::Index(index) => {
                let mut out = format!("{}Index\n", ind);
                out.push_str(&index.base.pretty_print(indent + 1));
                out.push_str(&index.index.pretty_print(indent + 1));
                out
            }
            Expr::Selector(selector) => {
                let mut out = format!(
                    "{}Selector .{} @{}\n",
                    ind, selector.member.name, selector.member.pos
                );
                out.push_str(&selector.base.pretty_print(indent + 1));
                out
            }
            Expr::Paren(paren) => {
                let mut out = format!("{}Paren\n", ind);
                out.push_str(&paren.inner.pretty_print(indent + 1));
                out
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn ident(name: &str, pos: usize) -> Ident {
        Ident::new(name, Pos(pos))
    }

    fn sample() -> Program {
        // contract C is B { uint x = 1; function f() { x = (x + 2); } }
        let assign = Expr::Binary(BinaryExpr {
            left: Box::new(Expr::Ident(ident("x", 38))),
            op: BinOp::Assign,
            op_pos: Pos(40),
            right: Box::new(Expr::Paren(ParenExpr {
                lparen: Pos(42),
                inner: Box::new(Expr::Binary(BinaryExpr {
                    left: Box::new(Expr::Ident(ident("x", 43))),
                    op: BinOp::Add,
                    op_pos: Pos(45),
                    right: Box::new(Expr::BasicLit(BasicLit {
                        kind: LitKind::Int,
                        value: "2".to_string(),
                        pos: Pos(47),
                    })),
                })),
            })),
        });

        Program {
            pragma: None,
            imports: vec![],
            contracts: vec![ContractPart {
                name: ident("C", 9),
                inherits: vec![ident("B", 14)],
                state_variables: vec![StateVariableDeclaration {
                    ty: ident("uint", 18),
                    visibility: None,
                    is_constant: false,
                    name: ident("x", 23),
                    rhs: Expr::BasicLit(BasicLit {
                        kind: LitKind::Int,
                        value: "1".to_string(),
                        pos: Pos(27),
                    }),
                }],
                functions: vec![FunctionDefinition {
                    name: ident("f", 39),
                    visibility: Visibility::Public,
                    body: vec![assign],
                }],
            }],
        }
    }

    #[test]
    fn test_pretty_print() {
        let expected = "\
Contract C @9 is B @14
  StateVariable uint x @23
    Int 1 @27
  Function f public @39
    Binary = @40
      Ident x @38
      Paren
        Binary + @45
          Ident x @43
          Int 2 @47
";
        assert_eq!(sample().pretty_print(), expected);
    }

    #[test]
    fn test_expr_pos_is_leftmost_token() {
        let program = sample();
        let body = &program.contracts[0].functions[0].body;
        assert_eq!(body[0].pos(), Pos(38));

        let Expr::Binary(binary) = &body[0] else {
            panic!("expected binary expression");
        };
        assert_eq!(binary.right.pos(), Pos(42));
    }

    #[test]
    fn test_visibility_keywords() {
        assert_eq!(Visibility::from_keyword("internal"), Some(Visibility::Internal));
        assert_eq!(Visibility::from_keyword("external"), None);
        assert_eq!(Visibility::Private.as_str(), "private");
    }

    #[test]
    fn test_serializes_to_json() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["contracts"][0]["name"]["name"], "C");
        assert_eq!(json["contracts"][0]["inherits"][0]["pos"], 14);
        assert_eq!(json["contracts"][0]["functions"][0]["visibility"], "Public");
        assert!(json["pragma"].is_null());
    }
}
