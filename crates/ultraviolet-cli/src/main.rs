//! `uvss` — command-line tools for Ultraviolet style sheets.
//!
//! ```text
//! uvss check <files>...                  report syntax and compilation errors
//! uvss fmt <file> [--check | --write]    print (or verify, or rewrite) canonical layout
//! uvss tokens <file>                     dump the lexer's token stream
//! uvss tree <file>                       dump the full-fidelity syntax tree
//! uvss play <file> <storyboard> ...      step a storyboard and print animated values
//! ```

use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use ultraviolet_engine::logging::{init_logging, LoggingConfig};
use ultraviolet_engine::time::FrameClock;
use ultraviolet_ui::controls::standard_registry;
use ultraviolet_ui::culture::Culture;
use ultraviolet_ui::style::{self, CompilationContext, CompilerOptions};
use ultraviolet_ui::{Presentation, PresentationConfig};
use ultraviolet_uvss::{lex, normalize_whitespace, parse_str, LineIndex, SyntaxElement, SyntaxNode};

// ── Command line ──────────────────────────────────────────────────────────────

#[derive(Debug, Parser)]
#[command(name = "uvss", version, about = "Tools for Ultraviolet style sheets (.uvss)")]
struct Cli {
    /// Log filter in env_logger syntax, e.g. `debug` or `ultraviolet_ui=trace`.
    #[arg(long, global = true)]
    log: Option<String>,

    /// Culture of this process (BCP-47). Keyframe literals still follow
    /// `$culture` directives.
    #[arg(long, global = true)]
    culture: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Report syntax and compilation errors.
    Check {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Print the stylesheet in canonical layout.
    Fmt {
        file: PathBuf,
        /// Exit with an error instead of printing when the file is not formatted.
        #[arg(long, conflicts_with = "write")]
        check: bool,
        /// Rewrite the file in place.
        #[arg(long)]
        write: bool,
    },
    /// Dump the token stream.
    Tokens { file: PathBuf },
    /// Dump the syntax tree.
    Tree { file: PathBuf },
    /// Play a storyboard on a markup tree and print animated values per step.
    Play {
        file: PathBuf,
        storyboard: String,
        /// UVML markup to animate; defaults to a single `Grid`.
        #[arg(long)]
        markup: Option<PathBuf>,
        /// Name of the element to play the storyboard on; defaults to the root.
        #[arg(long)]
        on: Option<String>,
        /// Total simulated time in milliseconds.
        #[arg(long, default_value_t = 1000)]
        duration: u64,
        /// Frame step in milliseconds.
        #[arg(long, default_value_t = 100)]
        step: u64,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log.clone().map(LoggingConfig::with_filter).unwrap_or_default());

    let culture = match &cli.culture {
        Some(name) => Culture::new(name).map_err(|name| anyhow::anyhow!("invalid culture name '{name}'"))?,
        None => Culture::invariant(),
    };

    match cli.command {
        Command::Check { files } => check(&files, &culture),
        Command::Fmt { file, check, write } => fmt(&file, check, write),
        Command::Tokens { file } => {
            print!("{}", render_tokens(&read(&file)?));
            Ok(())
        }
        Command::Tree { file } => {
            print!("{}", render_tree(&parse_str(&read(&file)?).root));
            Ok(())
        }
        Command::Play { file, storyboard, markup, on, duration, step } => {
            let markup = match markup {
                Some(path) => read(&path)?,
                None => r#"<Grid Name="root"/>"#.to_string(),
            };
            let request = PlayRequest { storyboard, on, duration, step };
            print!("{}", play(&read(&file)?, &markup, &request, culture)?);
            Ok(())
        }
    }
}

fn read(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
}

// ── check ─────────────────────────────────────────────────────────────────────

fn check(files: &[PathBuf], culture: &Culture) -> Result<()> {
    let options = CompilerOptions { execution_culture: culture.clone(), ..CompilerOptions::default() };
    let cx = CompilationContext::new(Rc::new(standard_registry())).with_options(options);

    let mut failed = 0;
    for path in files {
        let report = check_source(&path.display().to_string(), &read(path)?, &cx);
        if report.is_empty() {
            log::info!("{}: ok", path.display());
        } else {
            failed += 1;
            eprint!("{report}");
        }
    }
    if failed > 0 {
        bail!("{failed} of {} file(s) have errors", files.len());
    }
    Ok(())
}

/// One `name:line:col: kind: message` line per diagnostic.
fn check_source(name: &str, src: &str, cx: &CompilationContext) -> String {
    let (parse, doc) = style::compile_str(cx, src);
    let mut out = String::new();
    for d in &parse.diagnostics {
        let _ = writeln!(out, "{name}:{}:{}: syntax: {}", d.line, d.col, d.message);
    }
    if parse.ok() {
        let index = LineIndex::new(src);
        for e in &doc.diagnostics {
            let (line, col) = index.line_col(e.span.start);
            let _ = writeln!(out, "{name}:{line}:{col}: compile: {e}");
        }
    }
    out
}

// ── fmt ───────────────────────────────────────────────────────────────────────

fn fmt(path: &Path, check: bool, write: bool) -> Result<()> {
    let src = read(path)?;
    let parse = parse_str(&src);
    if !parse.ok() {
        bail!("{} has {} syntax error(s); not formatting", path.display(), parse.diagnostics.len());
    }
    let formatted = normalize_whitespace(&parse.root).to_full_string();

    if check {
        if formatted != src {
            bail!("{} is not formatted", path.display());
        }
    } else if write {
        if formatted != src {
            std::fs::write(path, &formatted).with_context(|| format!("writing {}", path.display()))?;
            log::info!("formatted {}", path.display());
        }
    } else {
        print!("{formatted}");
    }
    Ok(())
}

// ── tokens / tree ─────────────────────────────────────────────────────────────

fn render_tokens(src: &str) -> String {
    let index = LineIndex::new(src);
    let lexed = lex(src);
    let mut out = String::new();
    let mut offset = 0;
    for token in &lexed.tokens {
        offset += token.leading_width();
        let (line, col) = index.line_col(offset);
        let _ = writeln!(out, "{line}:{col} {:?} {:?}", token.kind(), token.text());
        offset += token.width() + token.trailing_width();
    }
    for d in &lexed.diagnostics {
        let _ = writeln!(out, "{d}");
    }
    out
}

fn render_tree(root: &SyntaxNode) -> String {
    fn walk(node: &SyntaxNode, depth: usize, out: &mut String) {
        let _ = writeln!(out, "{:indent$}{:?}", "", node.kind(), indent = depth * 2);
        for child in node.children() {
            match child {
                SyntaxElement::Node(n) => walk(n, depth + 1, out),
                SyntaxElement::Token(t) if t.is_missing() => {
                    let _ = writeln!(out, "{:indent$}{:?} (missing)", "", t.kind(), indent = (depth + 1) * 2);
                }
                SyntaxElement::Token(t) => {
                    let _ = writeln!(out, "{:indent$}{:?} {:?}", "", t.kind(), t.text(), indent = (depth + 1) * 2);
                }
            }
        }
    }
    let mut out = String::new();
    walk(root, 0, &mut out);
    out
}

// ── play ──────────────────────────────────────────────────────────────────────

struct PlayRequest {
    storyboard: String,
    on: Option<String>,
    duration: u64,
    step: u64,
}

/// Steps the storyboard from 0 to `duration` and prints, per step, every
/// directly animated property of every target element.
fn play(stylesheet: &str, markup: &str, request: &PlayRequest, culture: Culture) -> Result<String> {
    if request.step == 0 {
        bail!("--step must be positive");
    }
    let config = PresentationConfig { default_culture: culture, ..PresentationConfig::default() };
    let mut ui = Presentation::new(Rc::new(standard_registry()), config);
    ui.load_markup(markup, None).context("loading markup")?;
    ui.load_stylesheet(stylesheet).context("loading stylesheet")?;

    let root = ui.root().context("markup produced no root element")?;
    let scope = match &request.on {
        Some(name) => ui.find(name).with_context(|| format!("no element named '{name}'"))?,
        None => root,
    };
    let storyboard = ui
        .stylesheet()
        .and_then(|doc| doc.storyboard(&request.storyboard))
        .cloned()
        .with_context(|| format!("no storyboard named '{}'", request.storyboard))?;

    let mut watched = Vec::new();
    for target in &storyboard.targets {
        for id in target.elements(ui.tree(), scope) {
            for animation in target.animations.iter().filter(|a| a.navigation.is_none()) {
                let property = &animation.property;
                if let Some(dp) = ui.tree().find_by_name(id, property.owner.as_deref(), &property.name) {
                    let label = match ui.tree()[id].name() {
                        Some(name) => format!("{name}.{property}"),
                        None => format!("{}({id}).{property}", ui.tree()[id].type_name()),
                    };
                    watched.push((label, id, dp));
                }
            }
        }
    }

    let started = ui.play_storyboard(scope, &request.storyboard)?;
    log::debug!("'{}' animates {started} value(s)", request.storyboard);

    let mut frames = FrameClock::new();
    let mut out = String::new();
    let mut elapsed = 0;
    loop {
        let values: Vec<String> =
            watched.iter().map(|(label, id, dp)| format!("{label} = {}", ui.tree().get_value(*id, dp))).collect();
        let _ = writeln!(out, "{elapsed:>6} ms  {}", values.join("  "));
        if elapsed >= request.duration {
            break;
        }
        let step = request.step.min(request.duration - elapsed);
        elapsed += step;
        ui.update(&frames.advance(Duration::from_millis(step)))?;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_reports_syntax_then_compile_errors() {
        let cx = CompilationContext::new(Rc::new(standard_registry()));
        assert_eq!(check_source("a.uvss", "Button { Width: 1; }", &cx), "");
        let report = check_source("a.uvss", "Button {\n  Width: 1\n}", &cx);
        assert!(report.starts_with("a.uvss:3:1: syntax: expected ;, found }\n"), "{report}");
        let report = check_source("b.uvss", "Button {\n\tWobble: 1;\n}", &cx);
        assert!(report.starts_with("b.uvss:2:2: compile: "), "{report}");
        assert!(report.contains("Wobble"));
    }

    #[test]
    fn tokens_carry_their_positions() {
        let dump = render_tokens("Button {\n  Width: 1;\n}");
        let lines: Vec<&str> = dump.lines().collect();
        assert!(lines[0].starts_with("1:1 "));
        assert!(lines[0].ends_with("\"Button\""));
        assert!(lines.iter().any(|l| l.starts_with("2:3 ") && l.ends_with("\"Width\"")));
    }

    #[test]
    fn tree_marks_missing_tokens() {
        let tree = render_tree(&parse_str("Button { Width: 1 }").root);
        assert!(tree.lines().next().is_some_and(|l| !l.starts_with(' ')));
        assert!(tree.contains("(missing)"));
    }

    #[test]
    fn play_prints_each_step() {
        let request = PlayRequest { storyboard: "fade".into(), on: None, duration: 200, step: 100 };
        let out = play(
            "@fade { target { animation Opacity { keyframe 200 { 0 } } } }",
            r#"<Grid Name="root"/>"#,
            &request,
            Culture::invariant(),
        )
        .unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].ends_with("root.Opacity = 1"), "{out}");
        assert!(lines[1].ends_with("root.Opacity = 0.5"), "{out}");
        assert!(lines[2].ends_with("root.Opacity = 0"), "{out}");
    }

    #[test]
    fn play_rejects_unknown_storyboards() {
        let request = PlayRequest { storyboard: "nope".into(), on: None, duration: 100, step: 10 };
        let err = play("Grid { }", r#"<Grid/>"#, &request, Culture::invariant()).unwrap_err();
        assert!(err.to_string().contains("nope"));
    }
}
