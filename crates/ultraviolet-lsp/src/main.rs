//! `ultraviolet-lsp` — language server for `.uvss` stylesheets, spoken over
//! stdio. Editors start one process per workspace.

use tower_lsp::{LspService, Server};

mod analysis;
mod backend;
mod knowledge;

use backend::Backend;

#[tokio::main]
async fn main() {
    let (service, socket) = LspService::build(Backend::new).finish();
    Server::new(tokio::io::stdin(), tokio::io::stdout(), socket).serve(service).await;
}
