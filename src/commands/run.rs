//! Play a scenario file

use colored::*;
use eyre::Result;
use indexmap::IndexMap;
use serde::Serialize;
use std::path::Path;
use std::thread;
use std::time::Duration;

use crate::cli::OutputFormat;
use troupe::config::Config;
use troupe::conversation::{Conversation, RoundRecord};
use troupe::scenario::ScenarioFile;

#[derive(Serialize)]
struct SessionReport<'a> {
    scenario: &'a str,
    rounds: &'a [RoundRecord],
    /// role -> (counterpart -> score)
    relationships: IndexMap<String, IndexMap<String, i32>>,
    summary: String,
}

pub fn run(scenario_path: &Path, rounds: Option<usize>, pause_ms: u64, format: OutputFormat, config: &Config) -> Result<()> {
    let path = Config::expand_path(scenario_path);
    let scenario = ScenarioFile::load(&path)?;
    let mut conversation = scenario.to_conversation(config);

    let limit = rounds.unwrap_or(scenario.situations.len());
    let situations: Vec<&String> = scenario.situations.iter().take(limit).collect();
    log::info!("Playing {} of {} situations from {}", situations.len(), scenario.situations.len(), path.display());

    if format == OutputFormat::Text {
        println!("{} {}", "Scenario:".bold(), scenario.scenario.cyan());
    }

    for (i, situation) in situations.iter().enumerate() {
        if i > 0 && pause_ms > 0 {
            thread::sleep(Duration::from_millis(pause_ms));
        }

        let responses = conversation.run_round(situation);

        if format == OutputFormat::Text {
            print_round(i + 1, situation, &responses);
        }
    }

    let report = SessionReport {
        scenario: conversation.scenario(),
        rounds: conversation.history(),
        relationships: relationship_table(&conversation),
        summary: conversation.summary(),
    };

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Yaml => println!("{}", serde_yaml::to_string(&report)?),
        OutputFormat::Text => print_relationships(&report),
    }

    Ok(())
}

fn relationship_table(conversation: &Conversation) -> IndexMap<String, IndexMap<String, i32>> {
    conversation
        .characters()
        .iter()
        .map(|(key, character)| {
            let character = character.borrow();
            let scores = conversation
                .characters()
                .keys()
                .filter(|other| *other != key)
                .map(|other| (other.clone(), character.relationship(other)))
                .collect();
            (key.clone(), scores)
        })
        .collect()
}

fn print_round(round: usize, situation: &str, responses: &IndexMap<String, String>) {
    println!();
    println!("{} {}", format!("Round {}:", round).bold(), situation);
    println!("{}", "-".repeat(40).dimmed());
    for (name, response) in responses {
        println!("  {} {}", format!("{}:", name).green().bold(), response);
        println!();
    }
}

fn print_relationships(report: &SessionReport) {
    println!("{}", "Final Relationships:".bold());
    for (key, scores) in &report.relationships {
        for (other, score) in scores {
            println!("  {} → {}: {}/10", key.cyan(), other.cyan(), score);
        }
    }
    println!();
    println!("{}", report.summary.dimmed());
}
