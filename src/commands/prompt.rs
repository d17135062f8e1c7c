//! Preview rendered prompts without touching the backend

use colored::*;
use eyre::Result;
use std::path::Path;

use troupe::config::Config;
use troupe::scenario::ScenarioFile;

pub fn run(scenario_path: &Path, character: Option<&str>, situation: Option<&str>, config: &Config) -> Result<()> {
    let scenario = ScenarioFile::load(&Config::expand_path(scenario_path))?;
    let conversation = scenario.to_conversation(config);

    let situation = match situation {
        Some(s) => s,
        None => scenario.situations[0].as_str(),
    };

    if let Some(key) = character
        && !conversation.characters().contains_key(key)
    {
        let known: Vec<&str> = scenario.characters.keys().map(String::as_str).collect();
        eyre::bail!("Unknown character '{}' (known: {})", key, known.join(", "));
    }

    for (key, shared) in conversation.characters() {
        if character.is_some_and(|c| c != key.as_str()) {
            continue;
        }

        let context = conversation.context_for(key);
        let prompt = shared.borrow().render_prompt(situation, Some(&context));

        println!("{} {}", "●".green(), key.bold());
        println!("{}", prompt);
        println!();
    }

    Ok(())
}
