use anyhow::{bail, Context, Result};
use reviewsense_lib::services::config_store::{AppConfig, ConfigStore, ProviderConfig};
use reviewsense_lib::services::detection::{
    EntailmentClassifier, LexiconValenceClassifier, NeutralEntailmentClassifier, ValenceClassifier,
};
use reviewsense_lib::services::providers::{
    get_api_key, HttpEntailmentClassifier, HttpValenceClassifier, ProviderClient, ProviderError,
    INFERENCE_DEFAULT_URL,
};
use reviewsense_lib::{init_logging, AnalysisReport, SentimentAnalyzer};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

const USAGE: &str = "Usage:\n  analyze_review <text> [--offline] [--json] [--config <path>]\n  analyze_review --file <path> [--offline] [--json] [--config <path>]\n\nNotes:\n  - Providers disabled in the config (the default) fall back to the offline lexicon classifiers.\n  - `--offline` forces the offline classifiers even when providers are enabled.\n  - API keys resolve from REVIEWSENSE_<PROVIDER>_API_KEY, REVIEWSENSE_API_KEY or HF_API_TOKEN, then the config file.";

fn parse_arg_value(args: &[String], key: &str) -> Option<String> {
    args.iter()
        .position(|a| a == key)
        .and_then(|i| args.get(i + 1))
        .cloned()
}

fn has_flag(args: &[String], key: &str) -> bool {
    args.iter().any(|a| a == key)
}

/// First positional argument that is neither a flag nor a flag's value.
fn positional_text(args: &[String]) -> Option<String> {
    const VALUED: [&str; 2] = ["--file", "--config"];
    let mut skip_next = false;
    for arg in args.iter().skip(1) {
        if skip_next {
            skip_next = false;
            continue;
        }
        if VALUED.contains(&arg.as_str()) {
            skip_next = true;
            continue;
        }
        if arg.starts_with("--") {
            continue;
        }
        return Some(arg.clone());
    }
    None
}

fn resolve_api_key(config: &AppConfig, provider: &str, settings: &ProviderConfig) -> Result<Option<String>, ProviderError> {
    let key = get_api_key(provider).or_else(|| config.api_keys.get(provider).cloned());
    let hosted = settings.base_url.as_deref().map_or(true, |u| u.starts_with(INFERENCE_DEFAULT_URL));
    if key.is_none() && hosted {
        return Err(ProviderError::MissingApiKey);
    }
    Ok(key)
}

fn build_classifiers(
    config: &AppConfig,
    offline: bool,
) -> Result<(Arc<dyn ValenceClassifier>, Arc<dyn EntailmentClassifier>)> {
    let client = Arc::new(ProviderClient::new());

    let valence: Arc<dyn ValenceClassifier> = if !offline && config.valence.enabled {
        let key = resolve_api_key(config, "valence", &config.valence).context("valence provider")?;
        Arc::new(HttpValenceClassifier::from_config(client.clone(), &config.valence, key))
    } else {
        Arc::new(LexiconValenceClassifier::new(&config.analysis.lexicon))
    };

    let entailment: Arc<dyn EntailmentClassifier> = if !offline && config.entailment.enabled {
        let key = resolve_api_key(config, "entailment", &config.entailment).context("entailment provider")?;
        Arc::new(HttpEntailmentClassifier::from_config(client, &config.entailment, key))
    } else {
        Arc::new(NeutralEntailmentClassifier)
    };

    Ok((valence, entailment))
}

fn percent(v: f64) -> String {
    format!("{:.1}%", v * 100.0)
}

fn print_report(report: &AnalysisReport) {
    let result = &report.result;
    println!("Positive: {}", percent(result.probs.positive));
    println!("Neutral:  {}", percent(result.probs.neutral));
    println!("Negative: {}", percent(result.probs.negative));
    println!("Overall:  {}", result.overall);
    println!("Sarcasm:  {}", if result.sarcasm { "Likely" } else { "Unlikely" });

    if !result.aspects.is_empty() {
        println!();
        println!("Aspects:");
        for (aspect, detail) in &result.aspects {
            println!(
                "- {}: {} | P:{:.2} N:{:.2} U:{:.2}",
                aspect, detail.label, detail.probs.positive, detail.probs.negative, detail.probs.neutral
            );
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 || has_flag(&args, "--help") {
        eprintln!("{}", USAGE);
        return Ok(());
    }

    init_logging();

    let text = match parse_arg_value(&args, "--file") {
        Some(path) => std::fs::read_to_string(&path).with_context(|| format!("read {} failed", path))?,
        None => match positional_text(&args) {
            Some(text) => text,
            None => bail!("no review text given\n\n{}", USAGE),
        },
    };

    let store = match parse_arg_value(&args, "--config") {
        Some(path) => ConfigStore::from_file(PathBuf::from(path)),
        None => match ConfigStore::default_config_dir() {
            Some(dir) => ConfigStore::new(dir),
            None => bail!("no config directory available; pass --config <path>"),
        },
    };
    let config = store.load().with_context(|| format!("load {}", store.config_file().display()))?;

    let offline = has_flag(&args, "--offline");
    let (valence, entailment) = build_classifiers(&config, offline)?;
    info!(
        "[CLI] valence={} entailment={} offline={}",
        valence.name(),
        entailment.name(),
        offline
    );

    let analyzer = SentimentAnalyzer::new(valence, entailment, &config.analysis)?;
    let report = analyzer.analyze_detailed(&text).await?;

    if has_flag(&args, "--json") {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    Ok(())
}
