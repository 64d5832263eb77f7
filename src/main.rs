use std::io::Read;
use std::path::{Path, PathBuf};

use clap::Parser;
use demeterics_nodes::catalog::{Catalog, StaticCatalog};
use demeterics_nodes::config::Settings;
use demeterics_nodes::nodes::{NodeContext, NodeKind, node_for};
use demeterics_nodes::runner::{parse_input, render, run_batch, write_artifact};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "demeterics-nodes")]
#[command(about = "Run Demeterics gateway calls over a batch of parameter items", long_about = None)]
struct Cli {
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Emit an error record for a failing item instead of stopping
    #[arg(long)]
    continue_on_fail: bool,

    /// Where binary outputs (images, audio, csv/avro exports) are written
    #[arg(long, value_name = "DIR")]
    output_dir: Option<PathBuf>,

    #[arg(value_enum)]
    node: NodeKind,

    /// JSON file with one parameter object or an array of them (stdin when omitted)
    #[arg(value_name = "INPUT")]
    input: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let settings = Settings::load(cli.config.as_deref())?;
    let catalog = match &settings.catalog_path {
        Some(path) => StaticCatalog::load(Path::new(path))?,
        None => StaticCatalog::builtin(),
    };

    let text = match &cli.input {
        Some(path) => std::fs::read_to_string(path)?,
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };
    let items = parse_input(&text)?;

    let node = node_for(cli.node);
    let ctx = NodeContext::new(&settings, &catalog as &dyn Catalog);
    tracing::info!("Running {} node over {} item(s)", node.name(), items.len());
    let outputs = run_batch(node.as_ref(), &ctx, items, cli.continue_on_fail).await?;

    for (index, item) in outputs.iter().enumerate() {
        let written = match (&cli.output_dir, &item.binary) {
            (Some(dir), Some(artifact)) => Some(write_artifact(dir, index, artifact)?),
            _ => None,
        };
        println!("{}", render(item, written.as_deref()));
    }
    Ok(())
}
