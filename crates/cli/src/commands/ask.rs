//! `quarry ask`: One-shot research mode.

use super::load_agent;

pub async fn run(question: String, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let question = question.trim();
    if question.is_empty() {
        return Err("Question is empty".into());
    }

    let (_, mut agent) = load_agent()?;

    eprint!("  Researching...");
    let report = agent.run_report(question).await;
    eprint!("\r                \r");
    let report = report?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", report.answer);
    }
    Ok(())
}
