use solz_lexer::File;
use solz_parser::{ParseError, Parser};
use solz_resolve::{resolve_definition, DefinitionError};
use thiserror::Error;
use tower_lsp::lsp_types::Position;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Scope(DefinitionError),
}

/// Declaration of the identifier at a 0-based LSP position, parsing `text` afresh.
///
/// `Ok(None)` when the position is not on an identifier.
///
/// Characters are counted as Unicode scalar values, not UTF-16 code units, so
/// columns after an astral-plane character differ from the client's.
pub fn definition_at(text: &str, position: Position) -> Result<Option<Position>, QueryError> {
    let mut file = File::new();
    let program = Parser::parse(text, &mut file)?;

    let line = position.line as usize + 1;
    let character = position.character as usize + 1;
    let Some(target) = file.offset_of(line, character) else {
        return Ok(None);
    };

    match resolve_definition(&program, target) {
        Ok(def) => Ok(file
            .location(def)
            .map(|(line, character)| Position::new(line as u32 - 1, character as u32 - 1))),
        Err(DefinitionError::UnknownPosition) => Ok(None),
        Err(err) => Err(QueryError::Scope(err)),
    }
}
