use std::io::IsTerminal;

use anyhow::Result;
use camino::Utf8PathBuf;
use clap::Parser;
use tplvars::Extractor;
use tplvars_conf::Settings;

use super::pick_renderer;
use super::plural;
use super::read_inputs;
use super::render_parse_error;
use crate::args::Args;
use crate::commands::Command;
use crate::exit::Exit;

#[derive(Debug, Parser)]
pub struct Check {
    /// Template files to check. Reads stdin when omitted.
    paths: Vec<Utf8PathBuf>,
}

impl Command for Check {
    fn execute(&self, args: &Args, settings: &Settings) -> Result<Exit> {
        let inputs = read_inputs(&self.paths)?;
        let extractor = Extractor::new(settings);
        let renderer = pick_renderer(std::io::stdout().is_terminal());

        let mut error_count: usize = 0;
        for input in &inputs {
            match extractor.parse(&input.source) {
                Ok(nodes) => {
                    tracing::debug!(path = %input.path, nodes = nodes.len(), "template ok");
                }
                Err(err) => {
                    error_count += 1;
                    if !args.global.quiet {
                        println!("{}\n", render_parse_error(input, &err, &renderer));
                    }
                }
            }
        }

        if error_count > 0 {
            Ok(Exit::error().with_message(format!(
                "Found {} in {} checked.",
                plural(error_count, "error"),
                plural(inputs.len(), "file")
            )))
        } else {
            Ok(Exit::success())
        }
    }
}
