//! A simple program demonstrates how to use `plain-agent` as a library.

#[macro_use]
extern crate tracing;

use std::env;
use std::io::Write as _;
use std::pin::pin;
use std::str::FromStr;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use plain_agent::SessionBuilder;
use plain_agent::core::{AgentConfig, AgentError};
use plain_agent_openai_model::{OpenAIConfigBuilder, OpenAIProvider};
use tokio::io::{self, AsyncBufRead, AsyncBufReadExt, Lines};
use tokio::select;
use tokio::sync::mpsc;

const BAR_CHAR: &str = "▎";

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // A missing `.env` file is fine, the variables may come from the shell.
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let Ok(api_key) = env::var("OPENAI_API_KEY") else {
        eprintln!("OPENAI_API_KEY environment variable is not set");
        return;
    };
    let mut config_builder = OpenAIConfigBuilder::with_api_key(api_key);
    if let Ok(base_url) = env::var("OPENAI_BASE_URL") {
        config_builder = config_builder.with_base_url(base_url);
    }
    let model_provider = OpenAIProvider::new(config_builder.build());

    let agent_config = match agent_config_from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{err}");
            return;
        }
    };
    let root = match env::current_dir() {
        Ok(root) => root,
        Err(err) => {
            eprintln!("cannot determine the working directory: {err}");
            return;
        }
    };
    info!("starting with {agent_config:?} in {}", root.display());

    let (transcript_tx, mut transcript_rx) = mpsc::unbounded_channel();

    let mut session = match SessionBuilder::with_model_provider(model_provider)
        .with_config(agent_config)
        .with_root(root)
        .on_transcript(move |delta| {
            transcript_tx.send(delta.to_owned()).ok();
        })
        .build()
    {
        Ok(session) => session,
        Err(err) => {
            eprintln!("failed to set up tools: {err}");
            return;
        }
    };

    let progress_style = match ProgressStyle::with_template("{spinner} {wide_msg}")
    {
        Ok(style) => style.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"),
        Err(err) => {
            error!("invalid progress template: {err}");
            ProgressStyle::default_spinner()
        }
    };

    // One reader for the whole session, so lines buffered ahead of the
    // current one are not lost.
    let mut stdin = io::BufReader::new(io::stdin()).lines();

    println!("Type {} or {} to leave.", "exit".bold(), "quit".bold());
    loop {
        print!("> ");
        std::io::stdout().flush().ok();

        let Some(line) = read_line(&mut stdin).await else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line.eq_ignore_ascii_case("exit") || line.eq_ignore_ascii_case("quit")
        {
            break;
        }

        let progress_bar = ProgressBar::new_spinner();
        progress_bar.set_style(progress_style.clone());
        progress_bar.set_message("🤔 Thinking...");
        progress_bar.enable_steady_tick(Duration::from_millis(100));

        let mut printer = ReplyPrinter::new(progress_bar);
        let result = {
            let mut chat = pin!(session.send_message(line));
            loop {
                select! {
                    result = &mut chat => break result,
                    Some(delta) = transcript_rx.recv() => {
                        printer.print_delta(&delta);
                    }
                }
            }
        };
        while let Ok(delta) = transcript_rx.try_recv() {
            printer.print_delta(&delta);
        }
        printer.finish(result);
    }
}

fn agent_config_from_env() -> Result<AgentConfig, String> {
    let mut config = AgentConfig::default();
    if let Ok(model) = env::var("OPENAI_MODEL") {
        config = config.with_model_id(model);
    }
    if let Some(max_iterations) = parse_var::<usize>("AGENT_MAX_ITERATIONS")? {
        config = config.with_max_iterations(max_iterations);
    }
    if let Some(temperature) = parse_var::<f32>("AGENT_TEMPERATURE")? {
        config = config.with_temperature(temperature);
    }
    Ok(config)
}

fn parse_var<T: FromStr>(name: &str) -> Result<Option<T>, String> {
    let Ok(value) = env::var(name) else {
        return Ok(None);
    };
    value
        .trim()
        .parse()
        .map(Some)
        .map_err(|_| format!("{name} has an invalid value: {value}"))
}

/// Prints a reply while it streams in.
struct ReplyPrinter {
    // Spinning until the first text arrives.
    progress_bar: Option<ProgressBar>,
    streamed: String,
}

impl ReplyPrinter {
    fn new(progress_bar: ProgressBar) -> Self {
        Self {
            progress_bar: Some(progress_bar),
            streamed: String::new(),
        }
    }

    fn print_delta(&mut self, delta: &str) {
        // Finish the progress bar before printing anything else.
        if let Some(progress_bar) = self.progress_bar.take() {
            progress_bar.finish_and_clear();
            print!("{}🤖 ", BAR_CHAR.bright_cyan());
        }
        self.streamed.push_str(delta);
        print!("{}", delta.bright_white());
        std::io::stdout().flush().ok();
    }

    fn finish(mut self, result: Result<String, AgentError>) {
        if let Some(progress_bar) = self.progress_bar.take() {
            progress_bar.finish_and_clear();
        }
        if !self.streamed.is_empty() {
            println!();
        }
        match result {
            Ok(answer) if self.streamed.ends_with(&answer) => {}
            Ok(answer) => {
                println!("{}🤖 {}", BAR_CHAR.bright_cyan(), answer.bright_white());
            }
            Err(err) => {
                println!(
                    "{}⚠️  {}",
                    BAR_CHAR.bright_yellow(),
                    err.to_string().bright_red()
                );
            }
        }
        println!();
    }
}

async fn read_line<R: AsyncBufRead + Unpin>(
    lines: &mut Lines<R>,
) -> Option<String> {
    match lines.next_line().await {
        Ok(line) => line,
        Err(err) => {
            error!("error reading input: {}", err);
            None
        }
    }
}
