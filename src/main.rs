use std::sync::Arc;

use clap::Parser;
use tokio_util::sync::CancellationToken;

use tenk_core::session::SearchConfig;
use tenk_engine::SearchRunner;
use tenk_llm::{OllamaClient, ReliableLlm};
use tenk_retrieval::HttpRetriever;
use tenk_telemetry::{init_telemetry, TelemetryConfig};

/// Ask one question against a company's ingested report corpus.
#[derive(Debug, Parser)]
#[command(name = "tenk", version, about)]
struct Args {
    /// Company ticker the reports are partitioned by (e.g. UBER).
    ticker: String,

    /// The question to answer.
    question: String,

    /// Base URL of the completions endpoint.
    #[arg(long, default_value = "http://localhost:11434")]
    llm_url: String,

    /// Model name passed to the completions endpoint.
    #[arg(long, default_value = "mistral:instruct")]
    model: String,

    /// Base URL of the report vector-search service.
    #[arg(long, default_value = "http://localhost:9200")]
    retriever_url: String,

    /// Passages fetched per retrieval round.
    #[arg(long, default_value_t = 5)]
    top_k: usize,

    /// Hard bound on retrieval rounds.
    #[arg(long, default_value_t = 3)]
    max_iterations: u32,

    /// Minimum rounds before an accepting verdict is honored.
    #[arg(long)]
    min_iterations: Option<u32>,

    /// Joined-evidence character length that triggers compression.
    #[arg(long, default_value_t = 4000)]
    context_threshold: usize,

    /// Compression target as a fraction of the threshold.
    #[arg(long, default_value_t = 0.7)]
    compression_ratio: f64,

    /// Print the full outcome (rounds, evidence, termination) as JSON.
    #[arg(long)]
    json: bool,

    /// Emit logs as newline-delimited JSON.
    #[arg(long)]
    log_json: bool,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    init_telemetry(&TelemetryConfig {
        json_output: args.log_json,
        ..Default::default()
    });

    let llm = Arc::new(ReliableLlm::with_defaults(OllamaClient::new(
        args.llm_url.as_str(),
        args.model.as_str(),
    )));
    let retriever =
        Arc::new(HttpRetriever::new(args.retriever_url.as_str()).with_top_k(args.top_k));

    let config = SearchConfig {
        max_iterations: args.max_iterations,
        min_iterations: args.min_iterations,
        context_character_threshold: args.context_threshold,
        compression_target_ratio: args.compression_ratio,
    };

    let runner = SearchRunner::new(llm, retriever, config);

    // Ctrl-c aborts the in-flight round; the session is simply discarded.
    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupt received; aborting search");
            signal_cancel.cancel();
        }
    });

    match runner
        .run_with_cancel(&args.ticker, &args.question, &cancel)
        .await
    {
        Ok(outcome) => {
            if args.json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&outcome).expect("outcome serializes")
                );
            } else {
                println!("{}", outcome.answer);
                if outcome.is_low_confidence() {
                    eprintln!(
                        "note: the answer was cut off by iteration bounds and may be incomplete"
                    );
                }
            }
        }
        Err(e) => {
            tracing::error!(error = %e, "search failed");
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    }
}
