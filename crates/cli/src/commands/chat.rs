//! `quarry chat`: Interactive research session.

use std::io::Write;

use tokio::io::{AsyncBufReadExt, BufReader};

use super::load_agent;

/// What one line of REPL input asks for.
#[derive(Debug, PartialEq, Eq)]
enum ReplCommand<'a> {
    Empty,
    Quit,
    NewSession,
    Question(&'a str),
}

impl<'a> ReplCommand<'a> {
    fn parse(line: &'a str) -> Self {
        let trimmed = line.trim();
        match trimmed.to_ascii_lowercase().as_str() {
            "" => Self::Empty,
            "quit" | "exit" | "q" => Self::Quit,
            "new" | "reset" | "clear" => Self::NewSession,
            _ => Self::Question(trimmed),
        }
    }
}

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let (config, mut agent) = load_agent()?;

    println!();
    println!("  ╔══════════════════════════════════════════════╗");
    println!("  ║        Quarry — Web Research Assistant       ║");
    println!("  ╚══════════════════════════════════════════════╝");
    println!();
    println!("  Backend:   {}", agent.backend_name());
    println!("  Model:     {}", config.model);
    println!("  Actions:   web_search, web_scraper");
    println!("  Max steps: {}", config.max_steps);
    println!();
    println!("  Ask a question and press Enter.");
    println!("  Type 'new' to start over, 'exit' or Ctrl+D to quit.");
    println!();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("  You > ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };

        match ReplCommand::parse(&line) {
            ReplCommand::Empty => continue,
            ReplCommand::Quit => break,
            ReplCommand::NewSession => {
                agent.new_session();
                println!("  New session started.");
                println!();
            }
            ReplCommand::Question(question) => {
                eprint!("  Researching...");
                let result = agent.run(question).await;
                eprint!("\r                \r");

                match result {
                    Ok(answer) => {
                        println!();
                        for line in answer.lines() {
                            println!("  {line}");
                        }
                        println!();
                        println!("  ({})", agent.counters().summary());
                        println!();
                    }
                    Err(e) => {
                        eprintln!("  [Error] {e}");
                        println!();
                    }
                }
            }
        }
    }

    println!();
    println!("  Goodbye!");
    println!();
    Ok(())
}
