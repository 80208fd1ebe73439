use std::io::IsTerminal;

use anyhow::Context;
use anyhow::Result;
use camino::Utf8PathBuf;
use clap::Parser;
use clap::ValueEnum;
use serde::Serialize;
use tplvars::Extraction;
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
pub struct Extract {
    /// Template files to read. Reads stdin when omitted.
    paths: Vec<Utf8PathBuf>,

    /// Output format.
    #[arg(long, default_value_t = Format::Text, value_enum)]
    format: Format,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Format {
    /// One variable per line, grouped under each path when several are given.
    Text,
    /// The extraction result as JSON; an array of results for several paths.
    Json,
}

#[derive(Serialize)]
struct FileExtraction<'a> {
    path: &'a str,
    #[serde(flatten)]
    extraction: &'a Extraction,
}

impl Command for Extract {
    fn execute(&self, args: &Args, settings: &Settings) -> Result<Exit> {
        let inputs = read_inputs(&self.paths)?;
        let extractor = Extractor::new(settings);
        let renderer = pick_renderer(std::io::stderr().is_terminal());

        let mut failed = 0;
        let mut extractions = Vec::with_capacity(inputs.len());
        for input in &inputs {
            let result = extractor.try_extract(&input.source);
            if let Err(err) = &result {
                failed += 1;
                if !args.global.quiet {
                    eprintln!("{}\n", render_parse_error(input, err, &renderer));
                }
            }
            extractions.push(Extraction::from(result));
        }

        match self.format {
            Format::Text => {
                let grouped = inputs.len() > 1;
                for (input, extraction) in inputs.iter().zip(&extractions) {
                    if grouped {
                        println!("{}:", input.path);
                    }
                    for name in &extraction.variables {
                        if grouped {
                            println!("  {name}");
                        } else {
                            println!("{name}");
                        }
                    }
                }
            }
            Format::Json => {
                let json = if let [extraction] = extractions.as_slice() {
                    serde_json::to_string_pretty(extraction)
                } else {
                    let files: Vec<FileExtraction> = inputs
                        .iter()
                        .zip(&extractions)
                        .map(|(input, extraction)| FileExtraction {
                            path: &input.path,
                            extraction,
                        })
                        .collect();
                    serde_json::to_string_pretty(&files)
                }
                .context("Failed to serialize extraction")?;
                println!("{json}");
            }
        }

        if failed > 0 {
            Ok(Exit::error().with_message(format!(
                "Failed to parse {failed} of {}.",
                plural(inputs.len(), "template")
            )))
        } else {
            Ok(Exit::success())
        }
    }
}
