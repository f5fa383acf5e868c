//! Astral Chat
//!
//! Terminal chat with the celestial bodies of our solar system:
//! - Birth-data intake with validation retry loops
//! - Deterministic natal chart and report
//! - Tool-using advisor (one tool per planet, plus a human escape hatch)
//! - Roundtable mode with concurrently streaming personas

use anyhow::Result;
use std::io::{self, Write};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use astral_chat::astrology::MeanMotionEphemeris;
use astral_chat::orchestrator::{Conversation, ReplyMode};
use astral_chat::persona::{PersonaRegistry, PersonaStore};
use astral_chat::transport::TerminalTransport;
use astral_chat::ChatConfig;

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenv::dotenv().ok();

    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");

    println!("\n{}", "═".repeat(60));
    println!("🪐 Astral Chat v0.2.0");
    println!("{}", "═".repeat(60));
    println!("Conversations with the celestial bodies of our solar system");
    println!("{}\n", "═".repeat(60));

    let config = ChatConfig::from_env();
    let provider = config.build_provider();
    let transport = Arc::new(TerminalTransport::new());
    let ephemeris = Arc::new(MeanMotionEphemeris);

    // A personas file lets the cast be customized; otherwise the ten
    // builtin celestial bodies take the stage.
    let personas = match std::env::var("ASTRAL_PERSONAS_FILE") {
        Ok(path) => PersonaStore::new(path).load().await?,
        Err(_) => PersonaRegistry::builtin(),
    };

    let mode = match std::env::var("ASTRAL_MODE").as_deref() {
        Ok("roundtable") => ReplyMode::Roundtable,
        _ => ReplyMode::Advisor,
    };
    info!(model = %config.model, personas = personas.len(), ?mode, "starting chat");

    let mut conversation = Conversation::new(provider, transport, ephemeris, personas, config)
        .await
        .with_mode(mode);
    conversation.open().await?;

    println!("\n💡 Commands: 'quit' | 'history' | 'clear'\n");

    // Main interaction loop
    loop {
        print!("🤖 You: ");
        io::stdout().flush()?;

        let mut input = String::new();
        io::stdin().read_line(&mut input)?;
        let query = input.trim();

        if query.is_empty() {
            continue;
        }

        // Handle special commands
        match query.to_lowercase().as_str() {
            "quit" | "exit" | "q" => {
                println!("\n👋 Goodbye!\n");
                break;
            }
            "history" => {
                let session = conversation.session();
                let session = session.lock().await;
                println!("\n📜 Conversation History:\n{}\n", session.format_for_prompt());
                continue;
            }
            "clear" => {
                conversation.clear().await;
                println!("\n🗑️  History cleared.\n");
                continue;
            }
            _ => {}
        }

        if let Err(e) = conversation.handle_message(query).await {
            println!("❌ Error: {}\n", e);
        }
    }

    Ok(())
}
