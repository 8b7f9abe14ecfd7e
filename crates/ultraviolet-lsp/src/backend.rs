//! LSP backend: document store, diagnostics, formatting, hover, and completion.

use std::collections::HashMap;
use std::rc::Rc;
use std::sync::Arc;

use tokio::sync::RwLock;
use tower_lsp::jsonrpc::Result;
use tower_lsp::lsp_types::*;
use tower_lsp::{Client, LanguageServer};
use ultraviolet_ui::controls::standard_registry;
use ultraviolet_ui::culture::Culture;
use ultraviolet_ui::error::CompilationErrorKind;
use ultraviolet_ui::style::{self, CompilationContext, CompilerOptions};
use ultraviolet_ui::value::ValueType;
use ultraviolet_uvss::{normalize_whitespace, parse_str, LineIndex};

use crate::analysis::{completion_context, enclosing_rule_set, text_before, word_at, Context};
use crate::knowledge::{
    easing_doc, easing_names, keyword_doc, KeywordInfo, Knowledge, DOCUMENT_KEYWORDS, RULE_SET_KEYWORDS,
};

// ── Settings ──────────────────────────────────────────────────────────────────

/// Client-supplied `initializationOptions`:
/// `{ "culture": "ru-RU", "reportUnknownTypes": false }`.
#[derive(Debug, Clone)]
pub struct Settings {
    culture: Culture,
    report_unknown_types: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self { culture: Culture::invariant(), report_unknown_types: true }
    }
}

impl Settings {
    fn from_options(options: &serde_json::Value) -> Self {
        let mut settings = Self::default();
        if let Some(culture) = options.get("culture").and_then(|c| c.as_str()).and_then(|c| Culture::new(c).ok()) {
            settings.culture = culture;
        }
        if let Some(report) = options.get("reportUnknownTypes").and_then(|r| r.as_bool()) {
            settings.report_unknown_types = report;
        }
        settings
    }

    fn compilation_context(&self) -> CompilationContext {
        let options = CompilerOptions {
            execution_culture: self.culture.clone(),
            report_unknown_types: self.report_unknown_types,
        };
        CompilationContext::new(Rc::new(standard_registry())).with_options(options)
    }
}

// ── Backend ───────────────────────────────────────────────────────────────────

pub struct Backend {
    client: Client,
    docs: Arc<RwLock<HashMap<Url, String>>>,
    settings: Arc<RwLock<Settings>>,
}

impl Backend {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            docs: Arc::new(RwLock::new(HashMap::new())),
            settings: Arc::new(RwLock::new(Settings::default())),
        }
    }

    async fn update(&self, uri: Url, text: String) {
        let settings = self.settings.read().await.clone();
        let diagnostics = document_diagnostics(&text, &settings);
        self.client
            .log_message(MessageType::LOG, format!("{uri}: {} diagnostic(s)", diagnostics.len()))
            .await;
        self.client.publish_diagnostics(uri.clone(), diagnostics, None).await;
        self.docs.write().await.insert(uri, text);
    }
}

// ── LanguageServer impl ───────────────────────────────────────────────────────

#[tower_lsp::async_trait]
impl LanguageServer for Backend {
    async fn initialize(&self, params: InitializeParams) -> Result<InitializeResult> {
        if let Some(options) = &params.initialization_options {
            *self.settings.write().await = Settings::from_options(options);
        }
        Ok(InitializeResult {
            capabilities: ServerCapabilities {
                text_document_sync: Some(TextDocumentSyncCapability::Kind(TextDocumentSyncKind::FULL)),
                hover_provider: Some(HoverProviderCapability::Simple(true)),
                document_formatting_provider: Some(OneOf::Left(true)),
                completion_provider: Some(CompletionOptions {
                    trigger_characters: Some(vec![" ".to_string(), ":".to_string(), "\n".to_string()]),
                    ..Default::default()
                }),
                ..Default::default()
            },
            server_info: Some(ServerInfo {
                name: "ultraviolet-lsp".to_string(),
                version: Some(env!("CARGO_PKG_VERSION").to_string()),
            }),
        })
    }

    async fn initialized(&self, _params: InitializedParams) {
        self.client.log_message(MessageType::INFO, "ultraviolet-lsp ready").await;
    }

    async fn shutdown(&self) -> Result<()> {
        Ok(())
    }

    // ── Document lifecycle ────────────────────────────────────────────────────

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        self.update(params.text_document.uri, params.text_document.text).await;
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        // FULL sync: the last change holds the whole document.
        if let Some(change) = params.content_changes.into_iter().last() {
            self.update(params.text_document.uri, change.text).await;
        }
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        self.docs.write().await.remove(&params.text_document.uri);
        self.client.publish_diagnostics(params.text_document.uri, vec![], None).await;
    }

    // ── Formatting ────────────────────────────────────────────────────────────

    async fn formatting(&self, params: DocumentFormattingParams) -> Result<Option<Vec<TextEdit>>> {
        let docs = self.docs.read().await;
        Ok(docs.get(&params.text_document.uri).and_then(|text| format_document(text)))
    }

    // ── Hover ─────────────────────────────────────────────────────────────────

    async fn hover(&self, params: HoverParams) -> Result<Option<Hover>> {
        let uri = &params.text_document_position_params.text_document.uri;
        let pos = &params.text_document_position_params.position;

        let docs = self.docs.read().await;
        Ok(docs.get(uri).and_then(|text| hover_at(text, pos)))
    }

    // ── Completion ────────────────────────────────────────────────────────────

    async fn completion(&self, params: CompletionParams) -> Result<Option<CompletionResponse>> {
        let uri = &params.text_document_position.text_document.uri;
        let pos = &params.text_document_position.position;

        let docs = self.docs.read().await;
        let Some(text) = docs.get(uri) else {
            return Ok(None);
        };
        Ok(Some(CompletionResponse::Array(completion_items(text, pos))))
    }
}

// ── Diagnostics ───────────────────────────────────────────────────────────────

/// Syntax errors, then (for documents that parse cleanly) compilation errors
/// against the standard controls.
fn document_diagnostics(text: &str, settings: &Settings) -> Vec<Diagnostic> {
    let index = LineIndex::new(text);
    let parse = parse_str(text);
    let mut out: Vec<_> = parse
        .diagnostics
        .iter()
        .map(|d| diagnostic(&index, d.span.clone(), DiagnosticSeverity::ERROR, d.message.clone()))
        .collect();

    if parse.ok() {
        let doc = style::compile(&settings.compilation_context(), &parse.root);
        out.extend(doc.diagnostics.iter().map(|e| {
            let severity = match e.kind {
                CompilationErrorKind::UnresolvedType(_) => DiagnosticSeverity::WARNING,
                _ => DiagnosticSeverity::ERROR,
            };
            diagnostic(&index, e.span.clone(), severity, e.to_string())
        }));
    }
    out
}

fn diagnostic(index: &LineIndex, span: std::ops::Range<usize>, severity: DiagnosticSeverity, message: String) -> Diagnostic {
    let start = position(index, span.start);
    let mut end = position(index, span.end);
    if end == start {
        end.character += 1;
    }
    Diagnostic {
        range: Range { start, end },
        severity: Some(severity),
        source: Some("uvss".to_string()),
        message,
        ..Default::default()
    }
}

/// `LineIndex` is 1-based; LSP positions are 0-based.
fn position(index: &LineIndex, offset: usize) -> Position {
    let (line, col) = index.line_col(offset);
    Position::new(line.saturating_sub(1) as u32, col.saturating_sub(1) as u32)
}

// ── Formatting ────────────────────────────────────────────────────────────────

/// One edit replacing the whole document with its normalized layout.
/// Documents with syntax errors are left alone.
fn format_document(text: &str) -> Option<Vec<TextEdit>> {
    let parse = parse_str(text);
    if !parse.ok() {
        return None;
    }
    let formatted = normalize_whitespace(&parse.root).to_full_string();
    if formatted == text {
        return Some(vec![]);
    }
    let end = position(&LineIndex::new(text), text.len());
    Some(vec![TextEdit::new(Range::new(Position::new(0, 0), end), formatted)])
}

// ── Hover ─────────────────────────────────────────────────────────────────────

fn hover_at(text: &str, pos: &Position) -> Option<Hover> {
    let word = word_at(text, pos)?;

    if let Some(doc) = keyword_doc(word) {
        return Some(markdown_hover(format!("**{word}** · keyword\n\n{doc}")));
    }
    if let Some(md) = easing_doc(word) {
        return Some(markdown_hover(md));
    }

    let knowledge = Knowledge::standard();
    if let Some(md) = knowledge.type_doc(word) {
        return Some(markdown_hover(md));
    }

    // Property names resolve against the enclosing rule set's type, then
    // against attached properties.
    let ty = enclosing_rule_set(&text_before(text, pos)).and_then(|scope| scope.ty);
    let property = knowledge.property(ty.as_deref(), word).or_else(|| {
        knowledge.attached_properties().into_iter().find(|(_, p)| p.name == word).map(|(_, p)| p)
    })?;
    Some(markdown_hover(knowledge.property_doc(&property)))
}

// ── Completion item builders ──────────────────────────────────────────────────

fn completion_items(text: &str, pos: &Position) -> Vec<CompletionItem> {
    let knowledge = Knowledge::standard();
    match completion_context(text, pos) {
        Context::Selector => {
            let mut items = type_items(&knowledge);
            items.extend(keyword_items(DOCUMENT_KEYWORDS));
            items
        }
        Context::Property { ty } => {
            let mut items = property_items(&knowledge, ty.as_deref().unwrap_or("FrameworkElement"));
            items.extend(keyword_items(RULE_SET_KEYWORDS));
            items
        }
        Context::Value { ty, prop } => value_items(&knowledge, ty.as_deref(), &prop),
        Context::Easing => easing_items(),
        Context::Unknown => vec![],
    }
}

fn type_items(knowledge: &Knowledge) -> Vec<CompletionItem> {
    knowledge
        .type_names()
        .into_iter()
        .map(|name| {
            let mut item = CompletionItem::new_simple(name.to_string(), "element type".to_string());
            item.kind = Some(CompletionItemKind::CLASS);
            item.insert_text = Some(format!("{name} {{\n\t$0\n}}"));
            item.insert_text_format = Some(InsertTextFormat::SNIPPET);
            item
        })
        .collect()
}

fn property_items(knowledge: &Knowledge, ty: &str) -> Vec<CompletionItem> {
    let own = knowledge.properties(ty).into_iter().map(|(name, p)| (name.to_string(), p));
    own.chain(knowledge.attached_properties())
        .map(|(name, p)| {
            let mut item = CompletionItem::new_simple(name.clone(), p.value_type.to_string());
            item.kind = Some(CompletionItemKind::PROPERTY);
            item.insert_text = Some(format!("{name}: $0;"));
            item.insert_text_format = Some(InsertTextFormat::SNIPPET);
            item
        })
        .collect()
}

fn keyword_items(keywords: &[KeywordInfo]) -> Vec<CompletionItem> {
    keywords
        .iter()
        .map(|k| {
            let detail = k.doc.split(". ").next().unwrap_or("").to_string();
            let mut item = CompletionItem::new_simple(k.name.to_string(), detail);
            item.kind = Some(CompletionItemKind::KEYWORD);
            item.insert_text = Some(k.snippet.to_string());
            item.insert_text_format = Some(InsertTextFormat::SNIPPET);
            item
        })
        .collect()
}

fn value_items(knowledge: &Knowledge, ty: Option<&str>, prop: &str) -> Vec<CompletionItem> {
    let Some(property) = knowledge.property(ty, prop) else {
        return vec![];
    };

    match property.value_type {
        ValueType::Enum(variants) => variants
            .iter()
            .map(|v| {
                let mut item = CompletionItem::new_simple(v.to_string(), String::new());
                item.kind = Some(CompletionItemKind::ENUM_MEMBER);
                item
            })
            .collect(),

        ValueType::Bool => vec![value_item("true"), value_item("false")],

        ValueType::Color => vec![{
            let mut item =
                CompletionItem::new_simple("#rrggbbaa".to_string(), "Color literal (alpha optional)".to_string());
            item.kind = Some(CompletionItemKind::COLOR);
            item.insert_text = Some("#$0".to_string());
            item.insert_text_format = Some(InsertTextFormat::SNIPPET);
            item
        }],

        _ => vec![],
    }
}

fn easing_items() -> Vec<CompletionItem> {
    easing_names()
        .into_iter()
        .map(|name| {
            let mut item = CompletionItem::new_simple(name, "easing".to_string());
            item.kind = Some(CompletionItemKind::FUNCTION);
            item
        })
        .collect()
}

fn value_item(label: &str) -> CompletionItem {
    let mut item = CompletionItem::new_simple(label.to_string(), String::new());
    item.kind = Some(CompletionItemKind::VALUE);
    item
}

// ── Misc helpers ──────────────────────────────────────────────────────────────

fn markdown_hover(md: String) -> Hover {
    Hover {
        contents: HoverContents::Markup(MarkupContent { kind: MarkupKind::Markdown, value: md }),
        range: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(items: &[CompletionItem]) -> Vec<&str> {
        items.iter().map(|i| i.label.as_str()).collect()
    }

    fn hover_text(text: &str, line: u32, character: u32) -> String {
        match hover_at(text, &Position::new(line, character)).map(|h| h.contents) {
            Some(HoverContents::Markup(m)) => m.value,
            other => panic!("unexpected hover {other:?}"),
        }
    }

    #[test]
    fn syntax_errors_are_reported_at_their_position() {
        let diags = document_diagnostics("Button {\n  Width: 1\n}", &Settings::default());
        assert_eq!(diags[0].range.start, Position::new(2, 0));
        assert_eq!(diags[0].severity, Some(DiagnosticSeverity::ERROR));
    }

    #[test]
    fn compilation_errors_follow_a_clean_parse() {
        let src = "Button { Wobble: 1; }\nGizmo { }";
        let diags = document_diagnostics(src, &Settings::default());
        assert_eq!(diags.len(), 2);
        assert!(diags[0].message.contains("Wobble"));
        assert_eq!(diags[0].range.start.line, 0);
        assert_eq!(diags[1].severity, Some(DiagnosticSeverity::WARNING));

        let quiet = Settings::from_options(&serde_json::json!({ "reportUnknownTypes": false }));
        assert_eq!(document_diagnostics(src, &quiet).len(), 1);
    }

    #[test]
    fn formatting_replaces_the_document() {
        let edits = format_document("Button{Width:100;}").unwrap();
        assert_eq!(edits.len(), 1);
        assert_eq!(edits[0].new_text, "Button\n{\n\tWidth: 100;\n}");
        assert_eq!(edits[0].range.end, Position::new(0, 18));
        assert_eq!(format_document("Button\n{\n\tWidth: 100;\n}"), Some(vec![]));
        assert_eq!(format_document("Button{Width:100}"), None);
    }

    #[test]
    fn hover_covers_types_properties_and_keywords() {
        let src = "Button { Foreground: #000000; Grid.Row: 1; trigger event Click { } }";
        assert!(hover_text(src, 0, 2).starts_with("**Button**"));
        assert!(hover_text(src, 0, 12).starts_with("**Control.Foreground** · color"));
        assert!(hover_text(src, 0, 36).starts_with("**Grid.Row**"));
        assert!(hover_text(src, 0, 45).starts_with("**trigger** · keyword"));
        assert!(hover_at(src, &Position::new(0, 8)).is_none());
    }

    #[test]
    fn completion_depends_on_context() {
        let top = completion_items("", &Position::new(0, 0));
        assert!(labels(&top).contains(&"StackPanel"));
        assert!(labels(&top).contains(&"@storyboard"));

        let inside = completion_items("TextBlock { ", &Position::new(0, 12));
        assert!(labels(&inside).contains(&"Text"));
        assert!(labels(&inside).contains(&"Grid.Column"));
        assert!(labels(&inside).contains(&"trigger"));

        let value = completion_items("StackPanel { Orientation: ", &Position::new(0, 26));
        assert_eq!(labels(&value), vec!["Vertical", "Horizontal"]);

        let easing = completion_items("@a { target { animation Width { keyframe 10 ", &Position::new(0, 44));
        assert_eq!(easing.first().map(|i| i.label.as_str()), Some("ease-in-linear"));
    }
}
