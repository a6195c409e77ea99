use clap::Parser;
use std::fs::File;
use std::io::{self, BufRead, Write};
use std::net::Ipv4Addr;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tuner::{StreamRequest, StreamSession, TuneToken, TunerConfig, TunerError};

#[derive(Parser)]
#[command(
    name = "rtp-tuner",
    about = "Tune an RTSP or bare RTP feed and write its payload stream"
)]
struct Args {
    /// Stream URL (rtsp://... or rtp://host:port)
    url: String,

    #[arg(long)]
    username: Option<String>,

    #[arg(long)]
    password: Option<String>,

    /// RTSP control host (defaults to the URL host)
    #[arg(long)]
    remote_address: Option<String>,

    /// RTSP control port (defaults to the URL port, then 554)
    #[arg(long)]
    remote_port: Option<u16>,

    /// Base URL this tuner is reachable at; its host picks the bind address
    #[arg(long, default_value = "")]
    base_url: String,

    /// Local address to bind RTSP sockets to
    #[arg(long)]
    discovery_address: Option<Ipv4Addr>,

    /// Maximum bytes per UDP read
    #[arg(long, default_value_t = 1500)]
    chunk_size: usize,

    /// Seconds without data before the stream is abandoned
    #[arg(long, default_value_t = 5)]
    read_timeout_secs: u64,

    /// Write payload here instead of stdout
    #[arg(long, short)]
    output: Option<PathBuf>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt().with_writer(io::stderr).init();

    let args = Args::parse();
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e.describe());
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<(), TunerError> {
    let mut request = StreamRequest::new(&args.url)
        .with_advertised_base_url(&args.base_url)
        .with_read_chunk_size(args.chunk_size);
    request.username = args.username;
    request.password = args.password;
    request.remote_address = args.remote_address;
    request.remote_port = args.remote_port;

    let mut config =
        TunerConfig::default().with_read_timeout(Duration::from_secs(args.read_timeout_secs));
    if let Some(address) = args.discovery_address {
        config = config.with_discovery_address(address);
    }

    let token = TuneToken::new();
    let session = StreamSession::open_with_config(request, Arc::new(token.clone()), &config)?;
    tracing::info!(local = ?session.local_addr(), session_id = ?session.session_id(), "tuned");

    let mut out: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(File::create(path)?),
        None => Box::new(io::stdout().lock()),
    };

    eprintln!("Streaming {} - press Enter to stop", args.url);
    thread::spawn(move || release_on_enter(io::stdin().lock(), &token));

    let mut delivery = session.deliver()?;
    for chunk in delivery.by_ref() {
        out.write_all(&chunk?)?;
    }
    out.flush()?;

    let (chunks, bytes) = delivery.stats();
    tracing::info!(chunks, bytes, "stream ended");
    Ok(())
}

/// Release `token` once a line is read. End of input (e.g. `</dev/null`)
/// leaves the tune held.
fn release_on_enter<R: BufRead>(mut input: R, token: &TuneToken) {
    let mut line = String::new();
    match input.read_line(&mut line) {
        Ok(n) if n > 0 => token.release(),
        Ok(_) => tracing::debug!("stdin closed, stop with a signal instead"),
        Err(e) => tracing::warn!(error = %e, "cannot read stdin, stop with a signal instead"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use tuner::HoldSignal;

    #[test]
    fn enter_releases_token() {
        let token = TuneToken::new();
        release_on_enter(Cursor::new(b"\n".to_vec()), &token);
        assert!(!token.is_held());
    }

    #[test]
    fn closed_stdin_keeps_token_held() {
        let token = TuneToken::new();
        release_on_enter(Cursor::new(Vec::new()), &token);
        assert!(token.is_held());
    }

    #[test]
    fn args_parse() {
        let args = Args::parse_from([
            "rtp-tuner",
            "rtsp://cam/stream",
            "--remote-port",
            "8554",
            "--discovery-address",
            "10.0.0.2",
        ]);
        assert_eq!(args.remote_port, Some(8554));
        assert_eq!(args.discovery_address, Some(Ipv4Addr::new(10, 0, 0, 2)));
        assert_eq!(args.chunk_size, 1500);
    }
}
