use crate::document::read_document;
use crate::Kind;
use anyhow::{Context, Result};
use clap::{value_parser, Parser};
use resource_agent::Provider;
use std::path::PathBuf;

/// Parse and validate a document.
#[derive(Debug, Parser)]
pub(crate) struct Validate {
    /// The resource type the document describes.
    #[clap(long, value_enum)]
    pub(crate) kind: Kind,

    /// Path to the YAML or JSON document.
    #[clap(long, value_parser = value_parser!(PathBuf))]
    file: PathBuf,
}

impl Validate {
    pub(crate) fn run<P>(&self, provider: &P) -> Result<()>
    where
        P: Provider,
    {
        let document: P::Config = read_document(&self.file)?;
        provider
            .validate(&document)
            .into_result()
            .with_context(|| format!("Invalid {} document", provider.kind()))?;
        println!("'{}' is a valid {} document.", self.file.display(), provider.kind());
        Ok(())
    }
}
