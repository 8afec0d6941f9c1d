//! Beemind CLI - talk to a Mind from the shell
//!
//!   beemind ask <query>          → Converse once, output the answer
//!   beemind ideas <query>        → Matching skills with scores, nothing executed
//!   beemind skills               → Learned skills, best score first
//!   beemind history              → Remembered interactions, latest first
//!   beemind repl                 → Interactive conversation
//!   beemind watch                → Hot reload knowledge until interrupted
//!
//! Output format:
//!   --json     Output raw JSON (default for non-tty)
//!   --pretty   Pretty-print JSON (default for tty)

use beemind::logging::init_logging;
use beemind::{install_signal_handlers, watch, Attention, Mind, MindConfig};
use serde_json::{json, Value};
use std::env;
use std::io::{self, IsTerminal, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

fn main() {
    init_logging();

    let args: Vec<String> = env::args().collect();
    let opts = ParsedArgs::parse(&args[1..]);

    if opts.help {
        print_usage();
        return;
    }

    if opts.version {
        println!("beemind {}", env!("CARGO_PKG_VERSION"));
        return;
    }

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("{}", json!({"error": format!("Failed to create runtime: {}", e)}));
            std::process::exit(1);
        }
    };

    let result = rt.block_on(async {
        match opts.command.as_deref() {
            Some("ask") => cmd_ask(&opts).await,
            Some("ideas") => cmd_ideas(&opts).await,
            Some("skills") => cmd_skills(&opts).await,
            Some("history") => cmd_history(&opts).await,
            Some("repl") => cmd_repl(&opts).await,
            Some("watch") => cmd_watch(&opts).await,
            Some(cmd) => Err(format!("Unknown command: {}", cmd)),
            None => Ok(Value::Null),
        }
    });

    let pretty = opts.pretty || (!opts.json && io::stdout().is_terminal());
    match result {
        Ok(Value::Null) if opts.command.is_none() => print_usage(),
        Ok(Value::Null) => {}
        Ok(output) => println!("{}", render(&output, pretty)),
        Err(e) => {
            eprintln!("{}", render(&json!({"error": e}), pretty));
            std::process::exit(1);
        }
    }
}

fn render(value: &Value, pretty: bool) -> String {
    if pretty { serde_json::to_string_pretty(value).unwrap_or_default() } else { value.to_string() }
}

#[derive(Default)]
struct ParsedArgs {
    command: Option<String>,
    query: Option<String>,
    skills: Vec<String>,
    root: Option<String>,
    client: Option<String>,
    attention: Option<String>,
    json: bool,
    pretty: bool,
    help: bool,
    version: bool,
}

impl ParsedArgs {
    fn parse(args: &[String]) -> Self {
        // Load .env file if present
        if let Ok(contents) = std::fs::read_to_string(".env") {
            for line in contents.lines() {
                let line = line.trim();
                if line.is_empty() || line.starts_with('#') {
                    continue;
                }
                if let Some((key, value)) = line.split_once('=') {
                    let value = value.trim().trim_matches('"');
                    if !value.is_empty() && env::var(key.trim()).is_err() {
                        env::set_var(key.trim(), value);
                    }
                }
            }
        }

        let mut opts = ParsedArgs::default();
        let mut positional = Vec::new();
        let mut i = 0;

        while i < args.len() {
            let arg = &args[i];
            match arg.as_str() {
                "--help" | "-h" => opts.help = true,
                "--version" | "-V" => opts.version = true,
                "--json" => opts.json = true,
                "--pretty" => opts.pretty = true,
                "--skills" | "-s" => {
                    if i + 1 < args.len() {
                        opts.skills.push(args[i + 1].clone());
                        i += 1;
                    }
                }
                "--root" | "-r" => {
                    if i + 1 < args.len() {
                        opts.root = Some(args[i + 1].clone());
                        i += 1;
                    }
                }
                "--client" | "-c" => {
                    if i + 1 < args.len() {
                        opts.client = Some(args[i + 1].clone());
                        i += 1;
                    }
                }
                "--attention" | "-a" => {
                    if i + 1 < args.len() {
                        opts.attention = Some(args[i + 1].clone());
                        i += 1;
                    }
                }
                _ if !arg.starts_with('-') => positional.push(arg.clone()),
                _ => {} // Ignore unknown flags
            }
            i += 1;
        }

        // First positional is command, the rest is the query
        if !positional.is_empty() {
            opts.command = Some(positional.remove(0));
        }
        if !positional.is_empty() {
            opts.query = Some(positional.join(" "));
        }

        // Apply environment variables (lower priority than CLI args)
        if opts.client.is_none() {
            opts.client = env::var(beemind::core::paths::env::CLIENT).ok().filter(|s| !s.is_empty());
        }

        opts
    }

    fn client(&self) -> String {
        self.client.clone().unwrap_or_else(|| env::var("USER").unwrap_or_else(|_| "local".into()))
    }

    /// Environment config overridden by command line options
    fn config(&self) -> Result<MindConfig, String> {
        let mut config = MindConfig::from_env().map_err(|e| format!("{:#}", e))?;
        if let Some(root) = &self.root {
            config = config.with_root(root);
        }
        if !self.skills.is_empty() {
            config.skill_dirs = self.skills.iter().map(PathBuf::from).collect();
        }
        if let Some(a) = &self.attention {
            config.attention = Attention::from_str(a).ok_or_else(|| format!("Invalid attention: {}", a))?;
        }
        Ok(config)
    }

    async fn mind(&self) -> Result<Mind, String> {
        let config = self.config()?;
        let mind = Mind::open(config).await.map_err(|e| format!("Failed to load knowledge: {:#}", e))?;
        info!(skills = mind.skill_count(), "mind ready");
        Ok(mind)
    }

    fn query(&self) -> Result<&str, String> {
        self.query.as_deref().filter(|q| !q.trim().is_empty()).ok_or_else(|| "Missing query".to_string())
    }
}

fn print_usage() {
    println!(
        r#"beemind - rule-based dialogue from the shell

USAGE:
    beemind <command> [query] [options]

COMMANDS:
    ask <query>             Converse once and remember the turn
    ideas <query>           Show matching skills and scores
    skills                  List learned skills
    history                 Show remembered interactions of the client
    repl                    Interactive conversation
    watch                   Hot reload knowledge until interrupted

OPTIONS:
    --skills, -s <dir>      Knowledge directory (can repeat, env: BEEMIND_SKILLS)
    --root, -r <dir>        Data root (env: BEEMIND_ROOT)
    --client, -c <key>      Client key (env: BEEMIND_CLIENT, default: $USER)
    --attention, -a <n>     Short-term memory size or 'unbounded' (env: BEEMIND_ATTENTION)

OUTPUT OPTIONS:
    --json                  Raw JSON output
    --pretty                Pretty-print JSON
    --version, -V           Print version

EXAMPLES:
    # Ask once
    beemind ask "hello world" --skills ./skills

    # Why did that skill win?
    beemind ideas "what is the weather" --pretty

    # Pipe-friendly
    beemind ask "hello world" --json | jq -r .answer
"#
    );
}

async fn cmd_ask(opts: &ParsedArgs) -> Result<Value, String> {
    let query = opts.query()?;
    let mind = opts.mind().await?;
    let reaction = mind.converse(query, &opts.client()).await;
    Ok(json!({
        "query": reaction.query,
        "answer": reaction.text(),
        "ideas": reaction.ideas,
        "answers": reaction.answers,
    }))
}

async fn cmd_ideas(opts: &ParsedArgs) -> Result<Value, String> {
    let query = opts.query()?;
    let mind = opts.mind().await?;
    let ideas: Vec<Value> = mind.associate(query).await.iter().map(|idea| json!({
        "skill": idea.skill.summary(),
        "token": idea.token,
        "matches": idea.matches,
    })).collect();
    Ok(json!({"query": query, "ideas": ideas}))
}

async fn cmd_skills(opts: &ParsedArgs) -> Result<Value, String> {
    let mind = opts.mind().await?;
    let skills: Vec<Value> = mind.skills().iter().map(|s| s.summary()).collect();
    Ok(json!({"count": skills.len(), "skills": skills}))
}

async fn cmd_history(opts: &ParsedArgs) -> Result<Value, String> {
    let config = opts.config()?;
    let memories = beemind::Memories::from_config(&config);
    let client = opts.client();
    let history: Vec<Value> = memories.history(&client).await.iter().map(|i| json!({
        "query": i.query,
        "answer": i.answer(),
        "query_date": i.query_date.to_rfc3339(),
        "answer_time": i.answer_time,
    })).collect();
    Ok(json!({"client": client, "count": history.len(), "history": history}))
}

async fn cmd_repl(opts: &ParsedArgs) -> Result<Value, String> {
    println!("Beemind REPL - type 'help' or 'quit'\n");

    let mind = opts.mind().await?;
    let client = opts.client();

    loop {
        print!("beemind> ");
        io::stdout().flush().ok();

        let mut input = String::new();
        match io::stdin().read_line(&mut input) {
            Ok(0) | Err(_) => break,
            Ok(_) => {}
        }

        let input = input.trim();
        if input.is_empty() {
            continue;
        }

        match input {
            "quit" | "exit" | "q" => break,
            "help" | "?" => {
                println!("Commands:");
                println!("  :skills           - Count learned skills");
                println!("  :ideas <query>    - Show matching skills");
                println!("  quit              - Exit");
                println!("Anything else is a query.");
            }
            ":skills" => println!("{} skills", mind.skill_count()),
            _ if input.starts_with(":ideas ") => {
                for idea in mind.associate(&input[7..]).await {
                    println!("{:>12}  {}  {}", idea.skill.score().value, idea.skill.source(), idea.skill.score().log);
                }
            }
            query => {
                let reaction = mind.converse(query, &client).await;
                match reaction.text() {
                    Some(text) => println!("{}", text),
                    None => println!("..."),
                }
            }
        }
    }

    Ok(Value::Null)
}

async fn cmd_watch(opts: &ParsedArgs) -> Result<Value, String> {
    let mind = Arc::new(opts.mind().await?);
    let shutdown = install_signal_handlers();
    info!("Beemind watching {} skills, Ctrl+C to stop", mind.skill_count());
    watch(Arc::clone(&mind), shutdown).await;
    Ok(json!({"skills": mind.skill_count()}))
}
