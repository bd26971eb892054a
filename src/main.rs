use quakeview_lib::{run, RunOptions};

#[tokio::main]
async fn main() {
    let options = match parse_args() {
        Ok(Some(options)) => options,
        Ok(None) => return,
        Err(error) => {
            eprintln!("{error}");
            eprintln!("run with --help for usage");
            std::process::exit(2);
        }
    };

    if let Err(error) = run(options).await {
        eprintln!("quakeview failed: {error}");
        std::process::exit(1);
    }
}

fn parse_args() -> Result<Option<RunOptions>, String> {
    let mut options = RunOptions::default();

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--help" || arg == "-h" {
            print_help();
            return Ok(None);
        }

        if let Some(value) = arg.strip_prefix("--base-url=") {
            options.base_url = Some(value.to_string());
            continue;
        }
        if arg == "--base-url" {
            let value = args
                .next()
                .ok_or_else(|| "--base-url requires a value".to_string())?;
            options.base_url = Some(value);
            continue;
        }

        if let Some(value) = arg.strip_prefix("--poll-interval-ms=") {
            options.poll_interval_ms = Some(parse_positive(value, "--poll-interval-ms")?);
            continue;
        }
        if arg == "--poll-interval-ms" {
            let value = args
                .next()
                .ok_or_else(|| "--poll-interval-ms requires a value".to_string())?;
            options.poll_interval_ms = Some(parse_positive(&value, "--poll-interval-ms")?);
            continue;
        }

        if let Some(value) = arg.strip_prefix("--reconnect=") {
            options.reconnect = Some(parse_attempts(value)?);
            continue;
        }
        if arg == "--reconnect" {
            let value = args
                .next()
                .ok_or_else(|| "--reconnect requires a value".to_string())?;
            options.reconnect = Some(parse_attempts(&value)?);
            continue;
        }

        match arg.as_str() {
            "--no-stream" => options.no_stream = true,
            "--once" => options.once = true,
            other => return Err(format!("unknown argument: {other}")),
        }
    }

    Ok(Some(options))
}

fn parse_positive(value: &str, flag: &str) -> Result<u64, String> {
    let parsed = value
        .trim()
        .parse::<u64>()
        .map_err(|_| format!("{flag} expects a positive integer, got {value}"))?;
    if parsed == 0 {
        return Err(format!("{flag} must be greater than 0"));
    }
    Ok(parsed)
}

fn parse_attempts(value: &str) -> Result<u32, String> {
    let parsed = parse_positive(value, "--reconnect")?;
    u32::try_from(parsed).map_err(|_| format!("--reconnect is too large: {value}"))
}

fn print_help() {
    println!(
        "quakeview - live earthquake dashboard core

Usage: quakeview [options]

Options:
  --base-url <url>          event source service (default http://127.0.0.1:5000)
  --poll-interval-ms <ms>   poll period (default 300000)
  --no-stream               poll only, do not open the push channel
  --reconnect <n>           reopen a dropped push channel up to n times
  --once                    refresh once, print the dashboard view as JSON, exit
  -h, --help                show this help

Environment:
  QUAKEVIEW_BASE_URL, QUAKEVIEW_POLL_INTERVAL_MS, QUAKEVIEW_REQUEST_TIMEOUT_MS,
  QUAKEVIEW_STREAM, QUAKEVIEW_SCHEMA, QUAKEVIEW_DATA_DIR, RUST_LOG"
    );
}
