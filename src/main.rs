use clap::Parser;
use tracing_subscriber::EnvFilter;

use patter::core::config::Config;
use patter::ui::chat_loop;

#[derive(Parser)]
#[command(name = "patter")]
#[command(about = "A terminal chat client with a typewriter reveal")]
#[command(
    long_about = "Patter is a full-screen terminal chat client for services that stream \
assistant replies. Text is revealed with a typewriter animation that runs \
independently of network timing, and failed streams fall back to a \
non-streaming request before anything is reported to you.\n\n\
Environment Variables:\n\
  PATTER_BASE_URL   Chat service base URL (optional)\n\
  PATTER_TOKEN      API token; omitting it starts an anonymous session\n\n\
Controls:\n\
  Type              Enter your message in the input field\n\
  Enter             Send the message\n\
  Esc               Reveal the rest of the reply; press again to cancel\n\
  Ctrl+C            Quit"
)]
struct Args {
    #[arg(long, help = "Chat service base URL")]
    base_url: Option<String>,

    #[arg(long, help = "API token; omitting it starts an anonymous session")]
    token: Option<String>,

    #[arg(short, long, help = "Append the transcript to this file")]
    log: Option<String>,

    #[arg(long, help = "Minimum milliseconds between revealed characters")]
    char_delay_ms: Option<u64>,

    #[arg(long, help = "Characters revealed per display flush")]
    batch_size: Option<usize>,

    #[arg(long, help = "Anonymous sends allowed per session")]
    send_limit: Option<u32>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let mut config = Config::load().unwrap_or_else(|e| {
        eprintln!("Warning: {e}");
        Config::default()
    });

    if args.base_url.is_some() {
        config.base_url = args.base_url;
    }
    if config.base_url.is_none() {
        config.base_url = std::env::var("PATTER_BASE_URL").ok();
    }
    if args.token.is_some() {
        config.token = args.token;
    }
    if config.token.is_none() {
        config.token = std::env::var("PATTER_TOKEN").ok();
    }
    if args.log.is_some() {
        config.log_file = args.log;
    }
    if args.char_delay_ms.is_some() {
        config.char_delay_ms = args.char_delay_ms;
    }
    if args.batch_size.is_some() {
        config.batch_size = args.batch_size;
    }
    if args.send_limit.is_some() {
        config.anonymous_send_limit = args.send_limit;
    }

    chat_loop::run(config).await
}
