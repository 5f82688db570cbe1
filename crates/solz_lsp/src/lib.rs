//! Solidity Language Server Protocol implementation

mod definition;
mod document;

pub use definition::{definition_at, QueryError};
pub use document::{apply_change, byte_offset, ChangeEnd, ContentChange, DocumentStore, PatchError};

use tower_lsp::jsonrpc::{Error, Result};
use tower_lsp::lsp_types::*;
use tower_lsp::{Client, LanguageServer, LspService, Server};
use tracing::{error, info, warn};

/// The Solidity LSP backend
pub struct SolzLanguageServer {
    client: Client,
    documents: DocumentStore,
}

impl SolzLanguageServer {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            documents: DocumentStore::new(),
        }
    }

    pub fn documents(&self) -> &DocumentStore {
        &self.documents
    }
}

#[tower_lsp::async_trait]
impl LanguageServer for SolzLanguageServer {
    async fn initialize(&self, _: InitializeParams) -> Result<InitializeResult> {
        Ok(InitializeResult {
            capabilities: ServerCapabilities {
                text_document_sync: Some(TextDocumentSyncCapability::Kind(
                    TextDocumentSyncKind::INCREMENTAL,
                )),
                definition_provider: Some(OneOf::Left(true)),
                ..Default::default()
            },
            server_info: Some(ServerInfo {
                name: "solz".to_string(),
                version: Some(env!("CARGO_PKG_VERSION").to_string()),
            }),
        })
    }

    async fn initialized(&self, _: InitializedParams) {
        info!("initialized");
        self.client
            .log_message(MessageType::INFO, "solz language server initialized")
            .await;
    }

    async fn shutdown(&self) -> Result<()> {
        Ok(())
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        let doc = params.text_document;
        self.documents.open(doc.uri, doc.text);
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        let uri = params.text_document.uri;
        let changes = params.content_changes.into_iter().map(ContentChange::from);

        if let Err(err) = self.documents.apply_changes(&uri, changes) {
            error!(%uri, %err, "failed to apply changes");
            self.client
                .log_message(MessageType::ERROR, format!("{}: {}", uri, err))
                .await;
        }
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        self.documents.close(&params.text_document.uri);
    }

    async fn goto_definition(
        &self,
        params: GotoDefinitionParams,
    ) -> Result<Option<GotoDefinitionResponse>> {
        let uri = params.text_document_position_params.text_document.uri;
        let position = params.text_document_position_params.position;

        let Some(text) = self.documents.get(&uri) else {
            warn!(%uri, "definition requested for unknown document");
            return Ok(None);
        };

        match definition_at(&text, position) {
            Ok(Some(def)) => Ok(Some(GotoDefinitionResponse::Scalar(Location {
                uri,
                range: Range::new(def, def),
            }))),
            Ok(None) => Ok(None),
            Err(QueryError::Scope(err)) => {
                self.client
                    .show_message(MessageType::WARNING, err.to_string())
                    .await;
                Ok(None)
            }
            Err(QueryError::Parse(err)) => {
                warn!(%uri, %err, "parse failed");
                let mut rpc_error = Error::internal_error();
                rpc_error.message = err.to_string().into();
                Err(rpc_error)
            }
        }
    }
}

/// Run the LSP server over stdio
pub async fn run_server() {
    let stdin = tokio::io::stdin();
    let stdout = tokio::io::stdout();

    let (service, socket) = LspService::new(SolzLanguageServer::new);
    Server::new(stdin, stdout, socket).serve(service).await;
}
