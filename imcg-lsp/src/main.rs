//! is-my-code-great LSP server: publishes test smell diagnostics on open and save.

use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use imcg::config::load_config;
use imcg::{AnalysisEngine, Finding, SourceFile};
use tower_lsp::jsonrpc::Result as LspResult;
use tower_lsp::lsp_types::*;
use tower_lsp::{Client, LanguageServer, LspService, Server};
use tracing_subscriber::EnvFilter;

#[derive(Debug)]
struct Backend {
    client: Client,
    root: RwLock<Option<PathBuf>>,
    engine: RwLock<Arc<AnalysisEngine>>,
}

fn to_lsp_severity(s: imcg::Severity) -> DiagnosticSeverity {
    match s {
        imcg::Severity::Error => DiagnosticSeverity::ERROR,
        imcg::Severity::Warning => DiagnosticSeverity::WARNING,
        imcg::Severity::Info => DiagnosticSeverity::INFORMATION,
    }
}

fn finding_to_diagnostic(finding: &Finding) -> Diagnostic {
    let start = Position::new(
        finding.location.line.saturating_sub(1) as u32,
        finding.location.column.saturating_sub(1) as u32,
    );
    let end_line = finding.location.end_line.unwrap_or(finding.location.line);
    let end_col = finding
        .location
        .end_column
        .unwrap_or(finding.location.column + 1);
    let end = Position::new(
        end_line.saturating_sub(1) as u32,
        end_col.saturating_sub(1) as u32,
    );
    let message = match finding.suggestion {
        Some(ref hint) => format!("{}\n{}", finding.message, hint),
        None => finding.message.clone(),
    };
    Diagnostic {
        range: Range::new(start, end),
        severity: Some(to_lsp_severity(finding.severity)),
        code: Some(NumberOrString::String(finding.rule.to_string())),
        code_description: None,
        source: Some("is-my-code-great".to_string()),
        message,
        related_information: None,
        tags: None,
        data: None,
    }
}

/// Engine configured from the workspace's `.imcgrc.json`
fn load_engine(root: &Path) -> anyhow::Result<AnalysisEngine> {
    let config = load_config(root, None)?;
    Ok(AnalysisEngine::from_config(&config)?)
}

impl Backend {
    fn engine(&self) -> Arc<AnalysisEngine> {
        match self.engine.read() {
            Ok(guard) => Arc::clone(&guard),
            Err(_) => Arc::new(AnalysisEngine::with_defaults()),
        }
    }

    async fn publish(&self, uri: Url, text: &str, version: Option<i32>) {
        let Ok(path) = uri.to_file_path() else {
            self.client
                .log_message(
                    MessageType::WARNING,
                    format!("Could not resolve file path for {}", uri),
                )
                .await;
            return;
        };

        let engine = self.engine();
        // Files without a language profile get no diagnostics
        let Some(profile) = engine.profile_for(&path) else {
            return;
        };
        let file = SourceFile::new(path.as_path(), text, profile.id);
        let report = engine.analyze_file(&file);
        tracing::debug!(
            path = %path.display(),
            findings = report.findings.len(),
            "publishing diagnostics"
        );
        let diagnostics = report.findings.iter().map(finding_to_diagnostic).collect();
        self.client
            .publish_diagnostics(uri, diagnostics, version)
            .await;
    }
}

#[tower_lsp::async_trait]
impl LanguageServer for Backend {
    async fn initialize(&self, params: InitializeParams) -> LspResult<InitializeResult> {
        #[allow(deprecated)]
        let root = params.root_uri.and_then(|uri| uri.to_file_path().ok());
        if let Ok(mut guard) = self.root.write() {
            *guard = root;
        }
        Ok(InitializeResult {
            capabilities: ServerCapabilities {
                text_document_sync: Some(TextDocumentSyncCapability::Options(
                    TextDocumentSyncOptions {
                        open_close: Some(true),
                        change: Some(TextDocumentSyncKind::NONE),
                        save: Some(TextDocumentSyncSaveOptions::SaveOptions(SaveOptions {
                            include_text: Some(true),
                        })),
                        ..Default::default()
                    },
                )),
                ..Default::default()
            },
            server_info: Some(ServerInfo {
                name: "imcg-lsp".to_string(),
                version: Some(env!("CARGO_PKG_VERSION").to_string()),
            }),
        })
    }

    async fn initialized(&self, _: InitializedParams) {
        let root = self.root.read().ok().and_then(|guard| guard.clone());
        if let Some(root) = root {
            match load_engine(&root) {
                Ok(engine) => {
                    if let Ok(mut guard) = self.engine.write() {
                        *guard = Arc::new(engine);
                    }
                }
                Err(e) => {
                    self.client
                        .log_message(
                            MessageType::ERROR,
                            format!("Invalid configuration, using defaults: {:#}", e),
                        )
                        .await;
                }
            }
        }
        self.client
            .log_message(MessageType::INFO, "is-my-code-great LSP initialized")
            .await;
    }

    async fn shutdown(&self) -> LspResult<()> {
        Ok(())
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        let doc = params.text_document;
        self.publish(doc.uri, &doc.text, Some(doc.version)).await;
    }

    async fn did_save(&self, params: DidSaveTextDocumentParams) {
        let uri = params.text_document.uri;
        let text = match params.text {
            Some(text) => text,
            None => match uri.to_file_path().map(std::fs::read_to_string) {
                Ok(Ok(text)) => text,
                _ => {
                    self.client
                        .log_message(MessageType::WARNING, format!("Could not read {}", uri))
                        .await;
                    return;
                }
            },
        };
        self.publish(uri, &text, None).await;
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        self.client
            .publish_diagnostics(params.text_document.uri, vec![], None)
            .await;
    }
}

#[tokio::main]
async fn main() {
    // stdout carries the protocol; logs go to stderr
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_env("IMCG_LOG").unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .try_init();

    let stdin = tokio::io::stdin();
    let stdout = tokio::io::stdout();

    let (service, socket) = LspService::new(|client| Backend {
        client,
        root: RwLock::new(None),
        engine: RwLock::new(Arc::new(AnalysisEngine::with_defaults())),
    });
    Server::new(stdin, stdout, socket).serve(service).await;
}
