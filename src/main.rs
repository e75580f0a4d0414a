//! Command-line front end for TextAngel.
//!
//! Run with: textangel process --tone professional "I hate this, you are dumb"
//!
//! The message is taken from the remaining arguments, or from stdin when
//! none are given.

use std::path::PathBuf;

use anyhow::{bail, Context};
use tokio::io::AsyncReadExt;
use tracing_subscriber::EnvFilter;

use textangel::shield::parse_custom_words;
use textangel::{tone, Config, ProcessRequest, RewriterKind, ShieldResult, TextAngel};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Shield,
    Rewrite,
    Process,
    Tones,
    #[cfg(feature = "hosted")]
    Ping,
}

impl Command {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "shield" => Some(Command::Shield),
            "rewrite" => Some(Command::Rewrite),
            "process" => Some(Command::Process),
            "tones" => Some(Command::Tones),
            #[cfg(feature = "hosted")]
            "ping" => Some(Command::Ping),
            _ => None,
        }
    }
}

#[derive(Debug, Default)]
struct Options {
    config: Option<PathBuf>,
    tone: Option<String>,
    categories: Option<Vec<String>>,
    words: Vec<String>,
    user: Option<String>,
    backend: Option<RewriterKind>,
    mask: Option<char>,
    no_journal: bool,
    json: bool,
    message: Vec<String>,
}

fn print_help() {
    println!("TextAngel - shield harsh words and rewrite messages in a kinder tone");
    println!();
    println!("Usage: textangel <COMMAND> [OPTIONS] [MESSAGE...]");
    println!();
    println!("Commands:");
    println!("  shield     Shield a message someone sent you");
    println!("  rewrite    Rewrite a message with the local tone engine");
    println!("  process    Shield and rewrite a message you are about to send");
    println!("  tones      List the available tones");
    #[cfg(feature = "hosted")]
    println!("  ping       Check that the hosted rewrite service is alive");
    println!();
    println!("Options:");
    println!("  -c, --config <PATH>       TOML configuration file");
    println!("  -t, --tone <NAME>         Tone name or alias (grace, truth, calm, ...)");
    println!("  --categories <A,B>        Shield only these categories");
    println!("  --words <W1,W2>           Extra words to shield for this message");
    println!("  -u, --user <NAME>         Name recorded in the journal");
    println!("  -b, --backend <NAME>      Rewrite backend: local, openai, hosted");
    println!("  --mask <CHAR>             Mask matches with a repeated glyph");
    println!("  --no-journal              Do not record the message");
    println!("  --json                    Print the full result as JSON");
    println!("  -h, --help                Show this help");
}

fn next_value<'a>(args: &'a [String], i: &mut usize, flag: &str) -> anyhow::Result<&'a str> {
    *i += 1;
    args.get(*i)
        .map(String::as_str)
        .with_context(|| format!("{} needs a value", flag))
}

fn parse_args(args: &[String]) -> anyhow::Result<Option<(Command, Options)>> {
    let Some(first) = args.first() else {
        return Ok(None);
    };
    if matches!(first.as_str(), "-h" | "--help" | "help") {
        return Ok(None);
    }
    let command = Command::parse(first).with_context(|| format!("unknown command '{}'", first))?;

    let mut options = Options::default();
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" | "-c" => {
                options.config = Some(PathBuf::from(next_value(args, &mut i, "--config")?));
            }
            "--tone" | "-t" => {
                options.tone = Some(next_value(args, &mut i, "--tone")?.to_string());
            }
            "--categories" => {
                options.categories = Some(parse_custom_words(next_value(
                    args,
                    &mut i,
                    "--categories",
                )?));
            }
            "--words" => {
                options
                    .words
                    .extend(parse_custom_words(next_value(args, &mut i, "--words")?));
            }
            "--user" | "-u" => {
                options.user = Some(next_value(args, &mut i, "--user")?.to_string());
            }
            "--backend" | "-b" => {
                let value = next_value(args, &mut i, "--backend")?;
                options.backend = Some(value.parse().map_err(anyhow::Error::msg)?);
            }
            "--mask" => {
                let value = next_value(args, &mut i, "--mask")?;
                let mut chars = value.chars();
                match (chars.next(), chars.next()) {
                    (Some(glyph), None) => options.mask = Some(glyph),
                    _ => bail!("--mask takes a single character"),
                }
            }
            "--no-journal" => options.no_journal = true,
            "--json" => options.json = true,
            "--help" | "-h" => return Ok(None),
            other => options.message.push(other.to_string()),
        }
        i += 1;
    }

    Ok(Some((command, options)))
}

fn load_config(options: &Options) -> anyhow::Result<Config> {
    let mut config = match &options.config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("failed to load {}", path.display()))?,
        None => Config::default(),
    };
    if let Some(backend) = options.backend {
        config.service.backend = backend;
    }
    if let Some(glyph) = options.mask {
        config.shield.mask = Some(glyph);
    }
    if options.no_journal {
        config.journal.enabled = false;
    }
    config.service = config.service.with_api_key_from_env();
    Ok(config)
}

async fn read_message(options: &Options) -> anyhow::Result<String> {
    if !options.message.is_empty() {
        return Ok(options.message.join(" "));
    }
    let mut input = String::new();
    tokio::io::stdin()
        .read_to_string(&mut input)
        .await
        .context("failed to read message from stdin")?;
    Ok(input)
}

fn print_shield_summary(result: &ShieldResult) {
    if result.is_clean() {
        println!("✅ Nothing to shield.");
        return;
    }
    println!(
        "⚠️  {} word{} shielded across {} categor{}.",
        result.total_matches,
        if result.total_matches == 1 { "" } else { "s" },
        result.flagged_categories(),
        if result.flagged_categories() == 1 { "y" } else { "ies" },
    );
    for (category, count) in &result.matches_by_category {
        if *count > 0 {
            println!("   {}: {}", category, count);
        }
    }
    println!("   Blocked: {}", result.blocked_words().join(", "));
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some((command, options)) = parse_args(&args)? else {
        print_help();
        return Ok(());
    };

    match command {
        Command::Tones => {
            if options.json {
                return print_json(&tone::catalogue());
            }
            for profile in tone::catalogue() {
                println!("{:<16} {}", profile.name, profile.description);
                if !profile.aliases.is_empty() {
                    println!("{:<16} aliases: {}", "", profile.aliases.join(", "));
                }
            }
        }
        Command::Rewrite => {
            let message = read_message(&options).await?;
            if message.trim().is_empty() {
                bail!("message is empty");
            }
            let profile = match options.tone.as_deref() {
                Some(key) => tone::resolve(key),
                None => tone::default_tone(),
            };
            let result = tone::rewrite(&message, profile);
            if options.json {
                return print_json(&result);
            }
            println!("🕊️  {}", result.tone);
            println!("{}", result.rewritten_text);
        }
        Command::Shield => {
            let config = load_config(&options)?;
            let message = read_message(&options).await?;
            let angel = TextAngel::from_config(config)?;
            let user = options.user.as_deref().unwrap_or(textangel::angel::ANONYMOUS_USER);
            let outcome = angel.shield_incoming(user, &message).await?;
            if options.json {
                return print_json(&outcome);
            }
            print_shield_summary(&outcome.shield);
            println!();
            println!("🛡️  {}", outcome.shield.sanitized_text);
        }
        Command::Process => {
            let config = load_config(&options)?;
            let message = read_message(&options).await?;
            let angel = TextAngel::from_config(config)?;

            let mut request = ProcessRequest::new(message).with_custom_words(options.words);
            if let Some(user) = options.user {
                request = request.with_user(user);
            }
            if let Some(tone) = options.tone {
                request = request.with_tone(tone);
            }
            if let Some(categories) = options.categories {
                request = request.with_categories(categories);
            }

            let outcome = angel.process(request).await?;
            if options.json {
                return print_json(&outcome);
            }
            print_shield_summary(&outcome.shield);
            println!();
            println!("🕊️  {} (via {})", outcome.rewrite.tone, outcome.source);
            println!("{}", outcome.rewrite.rewritten_text);
            println!();
            println!("💡 {}", outcome.rewrite.guidance);
        }
        #[cfg(feature = "hosted")]
        Command::Ping => {
            let config = load_config(&options)?;
            let hosted = textangel::rewriter::HostedRewriter::new(&config.service)?;
            if hosted.ping().await? {
                println!("✅ Hosted service is alive");
            } else {
                bail!("hosted service answered but is not alive");
            }
        }
    }

    Ok(())
}
