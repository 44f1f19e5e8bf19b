//! Run the pipeline once over a JSON file of `{ "item": ..., "annotation": ... }`
//! records and print the output as JSON.
//!
//! Usage: `digest-run [records.json]` (stdin when no path is given).

use std::io::Read;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Deserialize;

use digest_analyzer::notify::{dispatch, BatchSummary, Notifier, WebhookNotifier};
use digest_analyzer::pipeline::AnnotationTable;
use digest_analyzer::{telemetry, Annotation, HttpFetcher, Item, Pipeline, PipelineConfig};

#[derive(Deserialize)]
struct Record {
    item: Item,
    #[serde(default)]
    annotation: Option<Annotation>,
}

fn read_input() -> Result<String> {
    match std::env::args().nth(1) {
        Some(path) => std::fs::read_to_string(&path).with_context(|| format!("reading {path}")),
        None => {
            let mut s = String::new();
            std::io::stdin()
                .read_to_string(&mut s)
                .context("reading records from stdin")?;
            Ok(s)
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Local .env is optional.
    let _ = dotenvy::dotenv();
    telemetry::init_tracing();

    let prometheus = if std::env::var("METRICS_RENDER").as_deref() == Ok("1") {
        Some(digest_analyzer::metrics::install_prometheus()?)
    } else {
        None
    };

    let cfg = PipelineConfig::load_default().context("loading pipeline config")?;
    let fetcher = Arc::new(HttpFetcher::new(&cfg.enrich.user_agent)?);
    let pipeline = Pipeline::new(cfg, fetcher).context("invalid pipeline configuration")?;

    let records: Vec<Record> =
        serde_json::from_str(&read_input()?).context("parsing input records")?;
    let mut annotations = AnnotationTable::default();
    let mut items = Vec::with_capacity(records.len());
    for r in records {
        if let Some(a) = r.annotation {
            annotations.insert(r.item.id.clone(), a);
        }
        items.push(r.item);
    }

    let out = pipeline.run(items, &annotations).await;

    let summary = BatchSummary::new(&out.metrics, &out.reports, 5);
    let channels: Vec<Box<dyn Notifier>> = vec![Box::new(WebhookNotifier::from_env())];
    let deliveries = dispatch(&channels, &summary).await;

    let doc = serde_json::json!({
        "output": out,
        "deliveries": deliveries,
    });
    println!("{}", serde_json::to_string_pretty(&doc)?);

    if let Some(handle) = prometheus {
        eprintln!("{}", handle.render());
    }
    Ok(())
}
