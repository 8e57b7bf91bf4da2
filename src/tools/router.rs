//! MCP tool router
//!
//! `CodeSnippetServer` is the entry point for MCP clients. It routes tool
//! calls to the handler modules and exposes notes as resources.
//!
//! ```text
//! MCP Client
//!     ↓
//! CodeSnippetServer (this module)
//!     ├─→ snippet_tools     (store_code_snippet, search_code_snippets)
//!     ├─→ dependency_tools  (store_dependency)
//!     ├─→ docs_tools        (store_crate_documentation, get_crate_documentation)
//!     ├─→ note_tools        (add_note, list_notes)
//!     ├─→ quality_tools     (code_review)
//!     ├─→ stats_tool        (code_stats)
//!     └─→ health_tool       (health_check)
//! ```

use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{
        Annotated, CallToolResult, Implementation, ListResourcesResult, PaginatedRequestParams,
        RawResource, ReadResourceRequestParams, ReadResourceResult, Resource, ResourceContents,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_handler, tool_router,
};

use super::ToolContext;
use super::dependency_tools::StoreDependencyParams;
use super::docs_tools::{GetCrateDocumentationParams, StoreCrateDocumentationParams};
use super::note_tools::AddNoteParams;
use super::quality_tools::CodeReviewParams;
use super::snippet_tools::{SearchCodeSnippetsParams, StoreCodeSnippetParams};
use crate::notes::NOTE_URI_PREFIX;

const INSTRUCTIONS: &str = "This server stores and searches a code knowledge base: \
store_code_snippet / search_code_snippets for reusable code, store_dependency for \
libraries worth remembering, store_crate_documentation / get_crate_documentation for \
crate docs, add_note / list_notes for scratch notes (also readable as note://internal/{title} \
resources), code_review to format and lint a snippet, code_stats for knowledge-base \
statistics, and health_check for backend status.";

/// Main tool router struct
#[derive(Clone)]
pub struct CodeSnippetServer {
    tool_router: ToolRouter<Self>,
    ctx: ToolContext,
    server_name: String,
    server_version: String,
}

impl CodeSnippetServer {
    pub fn new(
        ctx: ToolContext,
        server_name: impl Into<String>,
        server_version: impl Into<String>,
    ) -> Self {
        Self {
            tool_router: Self::tool_router(),
            ctx,
            server_name: server_name.into(),
            server_version: server_version.into(),
        }
    }

    pub fn context(&self) -> &ToolContext {
        &self.ctx
    }

    /// Notes as MCP resources, sorted by title
    pub fn note_resources(&self) -> Vec<Resource> {
        self.ctx
            .notes
            .list()
            .into_iter()
            .map(|note| {
                Annotated::new(
                    RawResource {
                        uri: note.uri(),
                        name: note.title.clone(),
                        title: None,
                        description: Some(format!("A note named {}", note.title)),
                        mime_type: Some("text/plain".into()),
                        size: None,
                        icons: None,
                        meta: None,
                    },
                    None,
                )
            })
            .collect()
    }

    /// Resolve a `note://internal/{title}` URI
    pub fn read_note(&self, uri: &str) -> Result<ReadResourceResult, McpError> {
        if !uri.starts_with(NOTE_URI_PREFIX) {
            return Err(McpError::invalid_params(
                format!("Unsupported resource URI: {}", uri),
                None,
            ));
        }

        match self.ctx.notes.get_by_uri(uri) {
            Some(note) => Ok(ReadResourceResult {
                contents: vec![ResourceContents::text(note.content, uri)],
            }),
            None => Err(McpError::resource_not_found(
                format!("Note not found: {}", uri),
                None,
            )),
        }
    }
}

#[tool_router]
impl CodeSnippetServer {
    #[tool(description = "Store a code snippet with language, description, source and tags for later semantic search")]
    async fn store_code_snippet(
        &self,
        Parameters(params): Parameters<StoreCodeSnippetParams>,
    ) -> Result<CallToolResult, McpError> {
        super::snippet_tools::store_code_snippet(&self.ctx, params).await
    }

    #[tool(description = "Semantic search over stored code snippets, optionally filtered by language, tags and minimum score")]
    async fn search_code_snippets(
        &self,
        Parameters(params): Parameters<SearchCodeSnippetsParams>,
    ) -> Result<CallToolResult, McpError> {
        super::snippet_tools::search_code_snippets(&self.ctx, params).await
    }

    #[tool(description = "Store a library dependency with version, language, description and usage example")]
    async fn store_dependency(
        &self,
        Parameters(params): Parameters<StoreDependencyParams>,
    ) -> Result<CallToolResult, McpError> {
        super::dependency_tools::store_dependency(&self.ctx, params).await
    }

    #[tool(description = "Store documentation and examples for a crate version")]
    async fn store_crate_documentation(
        &self,
        Parameters(params): Parameters<StoreCrateDocumentationParams>,
    ) -> Result<CallToolResult, McpError> {
        super::docs_tools::store_crate_documentation(&self.ctx, params).await
    }

    #[tool(description = "Get stored documentation for a crate, optionally for one version, newest first")]
    async fn get_crate_documentation(
        &self,
        Parameters(params): Parameters<GetCrateDocumentationParams>,
    ) -> Result<CallToolResult, McpError> {
        super::docs_tools::get_crate_documentation(&self.ctx, params).await
    }

    #[tool(description = "Add or replace an in-memory note (lost when the server restarts)")]
    async fn add_note(
        &self,
        Parameters(params): Parameters<AddNoteParams>,
    ) -> Result<CallToolResult, McpError> {
        super::note_tools::add_note(&self.ctx, params)
    }

    #[tool(description = "List all in-memory notes")]
    async fn list_notes(&self) -> Result<CallToolResult, McpError> {
        super::note_tools::list_notes(&self.ctx)
    }

    #[tool(description = "Format and lint code with the language's standard tools (rustfmt/clippy, prettier/eslint, black/pylint)")]
    async fn code_review(
        &self,
        Parameters(params): Parameters<CodeReviewParams>,
    ) -> Result<CallToolResult, McpError> {
        super::quality_tools::code_review(&self.ctx, params).await
    }

    #[tool(description = "Knowledge base statistics: collection, vector size, points per kind, notes")]
    async fn code_stats(&self) -> Result<CallToolResult, McpError> {
        super::stats_tool::code_stats(&self.ctx).await
    }

    #[tool(description = "Check the health of the vector store and the embedding service")]
    async fn health_check(&self) -> Result<CallToolResult, McpError> {
        super::health_tool::health_check(&self.ctx).await
    }
}

#[tool_handler]
impl ServerHandler for CodeSnippetServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(INSTRUCTIONS.into()),
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .enable_resources()
                .build(),
            server_info: Implementation {
                name: self.server_name.clone(),
                version: self.server_version.clone(),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn list_resources(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> impl std::future::Future<Output = Result<ListResourcesResult, McpError>> + Send + '_ {
        std::future::ready(Ok(ListResourcesResult {
            meta: None,
            next_cursor: None,
            resources: self.note_resources(),
        }))
    }

    fn read_resource(
        &self,
        request: ReadResourceRequestParams,
        _context: RequestContext<RoleServer>,
    ) -> impl std::future::Future<Output = Result<ReadResourceResult, McpError>> + Send + '_ {
        std::future::ready(self.read_note(&request.uri))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::{Embedding, EmbeddingError, EmbeddingProvider};
    use crate::notes::NoteStore;
    use crate::quality::QualityRunner;
    use crate::vector_store::VectorStore;
    use std::sync::Arc;

    struct NoEmbeddings;

    #[async_trait::async_trait]
    impl EmbeddingProvider for NoEmbeddings {
        async fn embed(&self, _text: &str) -> Result<Embedding, EmbeddingError> {
            Err(EmbeddingError::Request("offline".to_string()))
        }

        fn dimensions(&self) -> usize {
            4
        }

        async fn health_check(&self) -> Result<String, EmbeddingError> {
            Err(EmbeddingError::Request("offline".to_string()))
        }
    }

    fn server() -> CodeSnippetServer {
        let ctx = ToolContext::new(
            VectorStore::in_memory("test", 4),
            Arc::new(NoEmbeddings),
            NoteStore::new(),
            QualityRunner::default(),
        );
        CodeSnippetServer::new(ctx, "code-snippet-mcp", "0.0.0-test")
    }

    #[test]
    fn test_server_info() {
        let info = server().get_info();
        assert_eq!(info.server_info.name, "code-snippet-mcp");
        assert_eq!(info.server_info.version, "0.0.0-test");
        assert!(info.capabilities.tools.is_some());
        assert!(info.capabilities.resources.is_some());
    }

    #[test]
    fn test_all_tools_are_routed() {
        let server = server();
        let names: Vec<String> = server
            .tool_router
            .list_all()
            .into_iter()
            .map(|t| t.name.to_string())
            .collect();

        for expected in [
            "store_code_snippet",
            "search_code_snippets",
            "store_dependency",
            "store_crate_documentation",
            "get_crate_documentation",
            "add_note",
            "list_notes",
            "code_review",
            "code_stats",
            "health_check",
        ] {
            assert!(names.iter().any(|n| n == expected), "missing tool {}", expected);
        }
    }

    #[test]
    fn test_notes_are_resources() {
        let server = server();
        server.context().notes.add("plan", "ship it");

        let resources = server.note_resources();
        assert_eq!(resources.len(), 1);
        assert_eq!(resources[0].raw.uri, "note://internal/plan");

        let read = server.read_note("note://internal/plan").unwrap();
        assert_eq!(read.contents.len(), 1);

        assert!(server.read_note("note://internal/missing").is_err());

        server.context().notes.add("release plan", "tag it");
        let uri = "note://internal/release%20plan";
        assert!(server.note_resources().iter().any(|r| r.raw.uri == uri));
        assert_eq!(server.read_note(uri).unwrap().contents.len(), 1);
        assert!(server.read_note("file:///etc/hosts").is_err());
    }
}
