mod check;
mod extract;

use std::io::IsTerminal;
use std::io::Read as _;

use anyhow::bail;
use anyhow::Context;
use anyhow::Result;
use camino::Utf8PathBuf;
use clap::Subcommand;
use tplvars::ParseError;
use tplvars_conf::Settings;
use tplvars_source::Diagnostic;
use tplvars_source::DiagnosticRenderer;
use tplvars_source::LineIndex;

use crate::args::Args;
use crate::exit::Exit;

pub trait Command {
    fn execute(&self, args: &Args, settings: &Settings) -> Result<Exit>;
}

#[derive(Debug, Subcommand)]
pub enum TplvarsCommand {
    /// Print the free variables of templates
    Extract(self::extract::Extract),
    /// Report templates that fail to parse
    Check(self::check::Check),
}

impl Command for TplvarsCommand {
    fn execute(&self, args: &Args, settings: &Settings) -> Result<Exit> {
        match self {
            TplvarsCommand::Extract(cmd) => cmd.execute(args, settings),
            TplvarsCommand::Check(cmd) => cmd.execute(args, settings),
        }
    }
}

/// A template read from a file or stdin.
struct Input {
    path: String,
    source: String,
}

/// Read every path in order, or stdin when no paths are given.
fn read_inputs(paths: &[Utf8PathBuf]) -> Result<Vec<Input>> {
    if paths.is_empty() {
        if std::io::stdin().is_terminal() {
            bail!("No templates given: pass file paths or pipe a template on stdin");
        }
        let mut source = String::new();
        std::io::stdin()
            .read_to_string(&mut source)
            .context("Failed to read stdin")?;
        return Ok(vec![Input {
            path: "<stdin>".to_string(),
            source,
        }]);
    }

    paths
        .iter()
        .map(|path| {
            let source = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {path}"))?;
            Ok(Input {
                path: path.to_string(),
                source,
            })
        })
        .collect()
}

fn render_parse_error(input: &Input, error: &ParseError, renderer: &DiagnosticRenderer) -> String {
    let message = error.to_string();
    let (start, _) = error.span().to_line_col(&LineIndex::from_text(&input.source));
    tracing::debug!(
        path = %input.path,
        line = start.line() + 1,
        column = start.column() + 1,
        code = error.diagnostic_code(),
        "parse error"
    );
    let mut diagnostic = Diagnostic::new(
        &input.source,
        &input.path,
        error.diagnostic_code(),
        &message,
        error.span(),
        error.label(),
    );
    if let Some(span) = error.related_span() {
        diagnostic = diagnostic.annotation(span, "opened here", false);
    }
    if let Some(help) = error.help() {
        diagnostic = diagnostic.note(help);
    }
    renderer.render(&diagnostic)
}

fn pick_renderer(terminal: bool) -> DiagnosticRenderer {
    if terminal {
        DiagnosticRenderer::styled()
    } else {
        DiagnosticRenderer::plain()
    }
}

fn plural(count: usize, word: &str) -> String {
    if count == 1 {
        format!("{count} {word}")
    } else {
        format!("{count} {word}s")
    }
}
