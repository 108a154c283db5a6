//! Card command - shows the server's agent card.

use anyhow::Result;
use clap::Args;
use console::{Style, style};

use super::Context;

/// Arguments for the card command.
#[derive(Args, Debug)]
pub struct CardArgs {
    /// Also list skill examples
    #[arg(short, long)]
    pub detailed: bool,
}

/// Run the card command.
pub async fn run(args: CardArgs, ctx: &Context) -> Result<()> {
    let client = ctx.client()?;
    let card = client.agent_card().await?;

    if ctx.json_output {
        println!("{}", serde_json::to_string_pretty(&card)?);
        return Ok(());
    }

    let dim = Style::new().dim();
    let yes_no = |flag: bool| if flag { "yes" } else { "no" };

    println!();
    println!("{} {}", style(&card.name).bold(), dim.apply_to(&card.version));
    println!("{}", dim.apply_to("─".repeat(40)));
    if let Some(description) = &card.description {
        println!("  {}", description);
    }
    println!("  {} {}", dim.apply_to("URL:"), card.url);
    println!(
        "  {} {}",
        dim.apply_to("Streaming:"),
        yes_no(card.capabilities.streaming)
    );
    println!(
        "  {} {}",
        dim.apply_to("Push notifications:"),
        yes_no(card.capabilities.push_notifications)
    );

    if !card.skills.is_empty() {
        println!();
        println!("  {}", dim.apply_to("Skills:"));
        for skill in &card.skills {
            match &skill.description {
                Some(description) => {
                    println!("    {} - {}", style(&skill.name).bold(), description)
                }
                None => println!("    {}", style(&skill.name).bold()),
            }
            if args.detailed {
                for example in &skill.examples {
                    println!("      {} {}", dim.apply_to("e.g."), example);
                }
            }
        }
    }
    println!();
    Ok(())
}
