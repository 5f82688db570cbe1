use solz_ast::*;
use solz_lexer::Pos;
use thiserror::Error;
use tracing::{debug, trace};

use crate::scope::Scope;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DefinitionError {
    /// The target offset is not on any identifier occurrence
    #[error("unknown position")]
    UnknownPosition,
    /// The target is an identifier with no visible declaration
    #[error("definition of {name} is not found in scope")]
    NotInScope { name: String },
}

/// Outcome of visiting one node: `None` until the target occurrence is reached.
type Found = Option<Result<Pos, DefinitionError>>;

/// Single-use traversal state for one definition query
pub struct DefinitionFinder {
    target: Pos,
    scope: Scope,
}

/// Declaring position of the identifier at `target`
pub fn resolve_definition(program: &Program, target: Pos) -> Result<Pos, DefinitionError> {
    DefinitionFinder::find(program, target)
}

impl DefinitionFinder {
    #[tracing::instrument(level = "debug", skip(program), fields(contracts = program.contracts.len()))]
    pub fn find(program: &Program, target: Pos) -> Result<Pos, DefinitionError> {
        let mut finder = DefinitionFinder {
            target,
            scope: Scope::new(),
        };

        let result = finder
            .visit_program(program)
            .unwrap_or(Err(DefinitionError::UnknownPosition));
        debug!(?result, "definition query");
        result
    }

    fn push_scope(&mut self) {
        let old_scope = std::mem::take(&mut self.scope);
        self.scope = Scope::with_parent(old_scope);
        trace!(depth = self.scope.depth(), "push scope");
    }

    fn pop_scope(&mut self) {
        if let Some(parent) = std::mem::take(&mut self.scope).into_parent() {
            self.scope = parent;
        }
        trace!(depth = self.scope.depth(), "pop scope");
    }

    fn visit_program(&mut self, program: &Program) -> Found {
        // Contracts may be referenced before they are declared
        for contract in &program.contracts {
            self.scope.define(&contract.name.name, contract.name.pos);
        }

        for contract in &program.contracts {
            for base in &contract.inherits {
                if let Some(found) = self.visit_ident(base) {
                    return Some(found);
                }
            }

            self.push_scope();
            let found = self.visit_contract(contract);
            self.pop_scope();
            if found.is_some() {
                return found;
            }
        }

        None
    }

    fn visit_contract(&mut self, contract: &ContractPart) -> Found {
        for var in &contract.state_variables {
            self.scope.define(&var.name.name, var.name.pos);
        }
        for func in &contract.functions {
            self.scope.define(&func.name.name, func.name.pos);
        }

        for var in &contract.state_variables {
            if let Some(found) = self.visit_ident(&var.name) {
                return Some(found);
            }
            if let Some(found) = self.visit_expr(&var.rhs) {
                return Some(found);
            }
        }

        for func in &contract.functions {
            self.push_scope();
            let found = self.visit_function(func);
            self.pop_scope();
            if found.is_some() {
                return found;
            }
        }

        None
    }

    fn visit_function(&mut self, func: &FunctionDefinition) -> Found {
        func.body.iter().find_map(|expr| self.visit_expr(expr))
    }

    fn visit_expr(&mut self, expr: &Expr) -> Found {
        match expr {
            Expr::Ident(ident) => self.visit_ident(ident),
            Expr::BasicLit(_) => None,
            Expr::Binary(binary) => {
                if binary.op == BinOp::Assign {
                    if let Expr::Ident(ident) = binary.left.as_ref() {
                        self.declare_on_assign(ident);
                    }
                }
                self.visit_expr(&binary.left)
                    .or_else(|| self.visit_expr(&binary.right))
            }
            Expr::Call(call) => self
                .visit_expr(&call.callee)
                .or_else(|| call.args.iter().find_map(|arg| self.visit_expr(arg))),
            Expr::Index(index) => self
                .visit_expr(&index.base)
                .or_else(|| self.visit_expr(&index.index)),
            Expr::Selector(selector) => self
                .visit_expr(&selector.base)
                .or_else(|| self.visit_ident(&selector.member)),
            Expr::Paren(paren) => self.visit_expr(&paren.inner),
        }
    }

    /// Assigning to a name nothing declares yet introduces it at that
    /// occurrence, in the current scope. Later assignments do not move it.
    fn declare_on_assign(&mut self, ident: &Ident) {
        if self.scope.lookup(&ident.name).is_none() {
            trace!(name = %ident.name, pos = %ident.pos, "implicit declaration");
            self.scope.define(&ident.name, ident.pos);
        }
    }

    fn visit_ident(&mut self, ident: &Ident) -> Found {
        if ident.pos != self.target {
            return None;
        }

        Some(
            self.scope
                .lookup(&ident.name)
                .ok_or_else(|| DefinitionError::NotInScope {
                    name: ident.name.clone(),
                }),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use solz_lexer::File;
    use solz_parser::Parser;

    const HEADER: &str = r#"pragma solidity ^0.4.23;
import "../token/ERC20/StandardToken.sol";

contract SimpleToken is StandardToken {
	string public constant name = "SimpleToken";
	string public constant symbol = "SIM";
	uint8 public constant decimals = 18;
	uint256 public constant INITIAL_SUPPLY = 10000 * (10 ** uint256(decimals));
"#;

    fn parse(source: &str) -> (Program, File) {
        let mut file = File::new();
        let program = Parser::parse(source, &mut file).unwrap();
        (program, file)
    }

    /// Offset of the last character of `prefix` on a 1-based line
    fn at(file: &File, line: usize, prefix: &str) -> Pos {
        file.offset_of(line, prefix.chars().count()).unwrap()
    }

    fn definition(source: &str, line: usize, prefix: &str) -> Result<(usize, usize), DefinitionError> {
        let (program, file) = parse(source);
        let def = resolve_definition(&program, at(&file, line, prefix))?;
        Ok(file.location(def).unwrap())
    }

    fn with_constructor(body: &str) -> String {
        format!("{HEADER}\n\tconstructor() public {{\n{body}\t}}\n}}")
    }

    #[test]
    fn test_state_variable_to_state_variable() {
        let source = with_constructor("\t\ttotalSupply_ = INITIAL_SUPPLY;\n");
        let def = definition(
            &source,
            8,
            "\tuint256 public constant INITIAL_SUPPLY = 10000 * (10 ** uint256(d",
        );
        assert_eq!(def, Ok((7, "\tuint8 public constant d".len())));
    }

    #[test]
    fn test_function_body_to_state_variable() {
        let source = with_constructor(
            "\t\ttotalSupply_ = INITIAL_SUPPLY;\n\t\tbalances[msg.sender] = INITIAL_SUPPLY;\n",
        );
        let def = definition(&source, 11, "\t\ttotalSupply_ = I");
        assert_eq!(def, Ok((8, "\tuint256 public constant I".len())));
    }

    #[test]
    fn test_function_body_to_function() {
        let source = format!(
            "{HEADER}\n\tconstructor() public {{\n\t\ttotalSupply_ = INITIAL_SUPPLY;\n\t}}\n\n\tfunction a() public {{\n\t\tb();\n\t}}\n\n\tfunction b() public {{\n\t}}\n}}"
        );
        let def = definition(&source, 15, "\t\tb");
        assert_eq!(def, Ok((18, "\tfunction b".len())));
    }

    #[test]
    fn test_function_local_variable() {
        let source = with_constructor(
            "\t\ttotalSupply_ = INITIAL_SUPPLY;\n\t\ttotalSupply2_ = totalSupply_ * 2;\n",
        );
        assert_eq!(
            definition(&source, 12, "\t\ttotalSupply2_ = t"),
            Ok((11, "\t\tt".len()))
        );
        // The first assignment declares itself
        assert_eq!(definition(&source, 11, "\t\tt"), Ok((11, "\t\tt".len())));
    }

    #[test]
    fn test_later_assignment_does_not_redeclare() {
        let source = with_constructor(
            "\t\tx = 1;\n\t\tx = 2;\n\t\ty = x;\n\t\tINITIAL_SUPPLY = 3;\n\t\tz = INITIAL_SUPPLY;\n",
        );
        assert_eq!(definition(&source, 13, "\t\ty = x"), Ok((11, 3)));
        assert_eq!(
            definition(&source, 15, "\t\tz = I"),
            Ok((8, "\tuint256 public constant I".len()))
        );
    }

    #[test]
    fn test_contract_forward_reference() {
        let source = r#"pragma solidity ^0.4.23;
import "../token/ERC20/StandardToken.sol";

contract B is A {
}

contract A is StandardToken {
}"#;
        assert_eq!(
            definition(source, 4, "contract B is A"),
            Ok((7, "contract A".len()))
        );
    }

    #[test]
    fn test_unresolved_base_contract() {
        let source = "contract A is StandardToken {\n}";
        let err = definition(source, 1, "contract A is S").unwrap_err();
        assert_eq!(
            err,
            DefinitionError::NotInScope {
                name: "StandardToken".to_string()
            }
        );
    }

    #[test]
    fn test_undefined_variable() {
        let source = with_constructor(
            "\t\ttotalSupply_ = INITIAL_SUPPLY;\n\t\ttotalSupply2_ = totalSupplyUndefined_ * 2;\n",
        );
        let err = definition(&source, 12, "\t\ttotalSupply2_ = t").unwrap_err();
        assert_eq!(
            err.to_string(),
            "definition of totalSupplyUndefined_ is not found in scope"
        );
    }

    #[test]
    fn test_function_locals_do_not_leak() {
        let source = "contract C {\n\tfunction a() { x = 1; }\n\tfunction b() { y = x; }\n}";
        let err = definition(source, 3, "\tfunction b() { y = x").unwrap_err();
        assert_eq!(err, DefinitionError::NotInScope { name: "x".to_string() });
    }

    #[test]
    fn test_unknown_position() {
        let source = with_constructor("\t\ttotalSupply_ = INITIAL_SUPPLY;\n");
        let (program, file) = parse(&source);

        // whitespace, punctuation, a literal, a contract name, and past the end
        for target in [
            at(&file, 4, "contract "),
            at(&file, 4, "contract SimpleToken is StandardToken {"),
            at(&file, 5, "\tstring public constant name = \""),
            at(&file, 4, "contract S"),
            Pos(10_000),
        ] {
            assert_eq!(
                resolve_definition(&program, target),
                Err(DefinitionError::UnknownPosition),
                "target {target}"
            );
        }
    }

    #[test]
    fn test_selector_member_is_looked_up() {
        let source = with_constructor("\t\tbalances[msg.sender] = decimals;\n");
        let err = definition(&source, 11, "\t\tbalances[msg.s").unwrap_err();
        assert_eq!(err, DefinitionError::NotInScope { name: "sender".to_string() });
    }
}
