//! Alibi - 审讯控制台
//!
//! 入口：初始化日志、加载配置与嫌疑人名单、构建引擎，然后从 stdin 读取命令。

use std::sync::Arc;

use alibi::core::create_engine_builder;
use alibi::{observability, InterrogationEngine};
use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};

const HELP: &str = "\
Commands:
  talk <suspect> <question>                  question a suspect
  evidence <suspect> <evidence_id> <desc>    show a piece of evidence
  accuse <suspect>                           formally accuse a suspect
  expose <suspect> <contradiction_id>        confront a suspect with a contradiction
  pressure                                   show pressure for every suspect
  contradictions                             list detected contradictions
  thoughts <suspect>                         show a suspect's private assessments
  reset                                      start over
  quit";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    observability::init();

    let builder = create_engine_builder(None).context("Failed to load config or cast")?;
    let engine = Arc::new(builder.build());

    println!(
        "{}",
        engine.cast().title.as_deref().unwrap_or("Alibi")
    );
    for p in engine.cast().profiles() {
        println!("  {:<10} {} ({})", p.id, p.name, p.role);
    }
    println!("{HELP}");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print_prompt();
        let Some(line) = lines.next_line().await.context("Failed to read stdin")? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let (cmd, rest) = line.split_once(' ').unwrap_or((line, ""));
        let rest = rest.trim();

        let result = match cmd {
            "quit" | "exit" => break,
            "help" => {
                println!("{HELP}");
                Ok(())
            }
            "talk" => talk(&engine, rest).await,
            "evidence" => evidence(&engine, rest),
            "accuse" => engine.accuse(rest).map(|_| println!("You accuse {rest}.")).map_err(Into::into),
            "expose" => expose(&engine, rest),
            "pressure" => {
                show_pressure(&engine);
                Ok(())
            }
            "contradictions" => {
                show_contradictions(&engine);
                Ok(())
            }
            "thoughts" => {
                show_thoughts(&engine, rest);
                Ok(())
            }
            "reset" => {
                engine.reset_game().await;
                println!("The investigation starts over.");
                Ok(())
            }
            other => {
                println!("Unknown command '{other}'. Type 'help'.");
                Ok(())
            }
        };
        if let Err(e) = result {
            println!("error: {e:#}");
        }
    }

    engine.shutdown();
    Ok(())
}

fn print_prompt() {
    use std::io::Write;
    print!("> ");
    let _ = std::io::stdout().flush();
}

async fn talk(engine: &Arc<InterrogationEngine>, args: &str) -> anyhow::Result<()> {
    let (suspect, question) = args
        .split_once(' ')
        .context("usage: talk <suspect> <question>")?;
    let outcome = engine.interrogate(suspect, question.trim(), 0.0).await?;
    let name = engine.cast().get(suspect)?.name.clone();
    println!(
        "{name}: {}\n  [pressure {:.0} ({}), topic {}, tools: {}]",
        outcome.reply.message,
        outcome.pressure.level,
        outcome.pressure.category().as_str(),
        outcome.statement.topic,
        if outcome.reply.tools_used.is_empty() {
            "none".to_string()
        } else {
            outcome.reply.tools_used.join(", ")
        }
    );

    if let Some(check) = outcome.contradiction_check {
        tokio::spawn(async move {
            match check.await {
                Ok(found) => {
                    for c in found {
                        println!(
                            "\n  !! Contradiction ({:?}) between {} and {}: {} [id {}]",
                            c.severity,
                            c.statement1.suspect_name,
                            c.statement2.suspect_name,
                            c.explanation,
                            c.id
                        );
                        print_prompt();
                    }
                }
                Err(e) => tracing::warn!(error = %e, "contradiction check task failed"),
            }
        });
    }
    Ok(())
}

fn evidence(engine: &InterrogationEngine, args: &str) -> anyhow::Result<()> {
    let mut parts = args.splitn(3, ' ');
    let (Some(suspect), Some(evidence_id), Some(desc)) = (parts.next(), parts.next(), parts.next())
    else {
        anyhow::bail!("usage: evidence <suspect> <evidence_id> <description>");
    };
    let state = engine.on_evidence_shown(suspect, evidence_id, desc.trim(), "")?;
    println!("You show {suspect} {}. Pressure is now {:.0}.", desc.trim(), state.level);
    Ok(())
}

fn expose(engine: &InterrogationEngine, args: &str) -> anyhow::Result<()> {
    let (suspect, id) = args
        .split_once(' ')
        .context("usage: expose <suspect> <contradiction_id>")?;
    match engine.expose_contradiction(suspect, id.trim())? {
        Some(state) => println!("{suspect} squirms. Pressure is now {:.0}.", state.level),
        None => println!("That contradiction does not involve {suspect}."),
    }
    Ok(())
}

fn show_pressure(engine: &InterrogationEngine) {
    for id in engine.cast().ids() {
        if let Ok(s) = engine.pressure_state(id) {
            println!(
                "  {:<10} {:>5.1} {:<9} confrontations={} evidence={} exposed={}",
                id,
                s.level,
                s.category().as_str(),
                s.confrontations,
                s.evidence_presented.len(),
                s.contradictions_exposed
            );
        }
    }
}

fn show_contradictions(engine: &InterrogationEngine) {
    let found = engine.detected_contradictions();
    if found.is_empty() {
        println!("  No contradictions detected yet.");
    }
    for c in found {
        println!(
            "  [{}] {:?}: {} said \"{}\" / {} said \"{}\"\n      {}",
            c.id,
            c.severity,
            c.statement1.suspect_name,
            c.statement1.content,
            c.statement2.suspect_name,
            c.statement2.content,
            c.explanation
        );
    }
}

fn show_thoughts(engine: &InterrogationEngine, suspect: &str) {
    let thoughts = engine.monologues(suspect);
    if thoughts.is_empty() {
        println!("  No private thoughts recorded for '{suspect}'.");
    }
    for m in thoughts {
        println!(
            "  {} [{:?}] {} -> {}",
            m.timestamp.format("%H:%M:%S"),
            m.threat_level,
            m.thought,
            m.strategy
        );
    }
}
