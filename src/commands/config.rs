use colored::*;
use eyre::Result;

use crate::cli::{ConfigAction, OutputFormat};
use troupe::config::Config;

pub fn run(action: ConfigAction, config: &Config) -> Result<()> {
    match action {
        ConfigAction::Show { format } => show(OutputFormat::resolve(format), config),
        ConfigAction::Get { key } => get(&key, config),
    }
}

fn show(format: OutputFormat, config: &Config) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(config)?);
        }
        OutputFormat::Yaml => {
            println!("{}", serde_yaml::to_string(config)?);
        }
        OutputFormat::Text => {
            println!("{}", "Troupe Configuration".bold());
            println!();

            println!("{}:", "backend".cyan());
            println!("  endpoint: {}", config.backend.endpoint);
            println!("  model: {}", config.backend.model);
            println!("  timeout_secs: {}", config.backend.timeout_secs);
            println!("  temperature: {}", config.backend.temperature);
            println!("  top_p: {}", config.backend.top_p);
            println!("  num_predict: {}", config.backend.num_predict);
            println!();

            println!("{}:", "retry".cyan());
            println!("  max_attempts: {}", config.retry.max_attempts);
            println!("  validation_backoff_ms: {}", config.retry.validation_backoff_ms);
            println!("  failure_backoff_ms: {}", config.retry.failure_backoff_ms);
            println!();

            println!("{}:", "sanitizer".cyan());
            println!("  min_chars: {}", config.sanitizer.min_chars);
            println!("  max_words: {}", config.sanitizer.max_words);
            println!("  cut_words: {}", config.sanitizer.cut_words);
            println!();

            println!("min_words: {}", config.min_words);
            println!("log_level: {}", config.log_level.as_filter());
        }
    }

    Ok(())
}

fn lookup(key: &str, config: &Config) -> Option<String> {
    let value = match key {
        "backend.endpoint" => config.backend.endpoint.clone(),
        "backend.model" => config.backend.model.clone(),
        "backend.timeout_secs" => config.backend.timeout_secs.to_string(),
        "backend.temperature" => config.backend.temperature.to_string(),
        "backend.top_p" => config.backend.top_p.to_string(),
        "backend.num_predict" => config.backend.num_predict.to_string(),
        "retry.max_attempts" => config.retry.max_attempts.to_string(),
        "retry.validation_backoff_ms" => config.retry.validation_backoff_ms.to_string(),
        "retry.failure_backoff_ms" => config.retry.failure_backoff_ms.to_string(),
        "sanitizer.min_chars" => config.sanitizer.min_chars.to_string(),
        "sanitizer.max_words" => config.sanitizer.max_words.to_string(),
        "sanitizer.cut_words" => config.sanitizer.cut_words.to_string(),
        "min_words" | "min-words" => config.min_words.to_string(),
        "log_level" | "log-level" => config.log_level.as_filter().to_string(),
        _ => return None,
    };
    Some(value)
}

fn get(key: &str, config: &Config) -> Result<()> {
    match lookup(key, config) {
        Some(v) => println!("{}", v),
        None => {
            eprintln!("{} Unknown config key: {}", "✗".red(), key);
            std::process::exit(1);
        }
    }

    Ok(())
}
