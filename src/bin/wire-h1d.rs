//! Demo server: static pages, plus a chunked stream finished with checksum
//! trailers.
//!
//! Build with `cargo run --features cli --bin wire-h1d`.

use clap::Parser;
use futures_lite::future;
use sha2::{Digest, Sha256};
use tracing_subscriber::EnvFilter;
use wire_h1::server::{default_headers, Connection, ResponseWriter, Server, ServerOptions, StatusCode};
use wire_h1::{Headers, Request};

const STREAM_CHUNK_LEN: usize = 1024;

/// Serve demo pages over hand-parsed HTTP/1.1.
#[derive(Debug, Parser)]
#[command(name = "wire-h1d", version)]
struct Config {
    /// Address to listen on
    #[arg(long, default_value = "127.0.0.1", env = "WIRE_H1_HOST")]
    host: String,

    /// Port to listen on
    #[arg(short, long, default_value = "42069", env = "WIRE_H1_PORT")]
    port: u16,

    /// Largest request read buffer in bytes
    #[arg(long, default_value = "65536", env = "WIRE_H1_MAX_BUFFER_LEN")]
    max_buffer_len: usize,
}

fn main() -> std::io::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::parse();
    let opts = ServerOptions::default().max_buffer_len(Some(config.max_buffer_len));
    let server = Server::serve_with_opts((config.host.as_str(), config.port), handle, opts)?;
    log::info!("serving on http://{}", server.local_addr());

    async_global_executor::block_on(future::pending::<()>());
    Ok(())
}

async fn handle(res: ResponseWriter<Connection>, req: Request) {
    let target = req.target();
    let result = if let Some(len) = target.strip_prefix("/stream/") {
        match len.parse::<usize>() {
            Ok(len) => stream(res, len).await,
            Err(_) => page(res, StatusCode::BadRequest, BAD_REQUEST_PAGE).await,
        }
    } else {
        match target {
            "/yourproblem" => page(res, StatusCode::BadRequest, BAD_REQUEST_PAGE).await,
            "/myproblem" => page(res, StatusCode::InternalServerError, SERVER_ERROR_PAGE).await,
            _ => page(res, StatusCode::Ok, OK_PAGE).await,
        }
    };

    if let Err(err) = result {
        log::debug!("failed to respond to {}: {}", req.target(), err);
    }
}

async fn page(mut res: ResponseWriter<Connection>, status: StatusCode, body: &str) -> wire_h1::Result<()> {
    let mut headers = default_headers(body.len());
    headers.set("Content-Type", "text/html")?;

    res.write_status_line(status).await?;
    res.write_headers(&headers).await?;
    res.write_body(body.as_bytes()).await?;
    res.flush().await
}

/// Stream `len` generated bytes as a chunked body, then report their SHA-256
/// and length in trailers.
async fn stream(mut res: ResponseWriter<Connection>, len: usize) -> wire_h1::Result<()> {
    let headers = Headers::try_from([
        ("Content-Type", "text/plain"),
        ("Connection", "close"),
        ("Transfer-Encoding", "chunked"),
        ("Trailer", "X-Content-SHA256, X-Content-Length"),
    ])?;

    res.write_status_line(StatusCode::Ok).await?;
    res.write_headers(&headers).await?;

    let mut hasher = Sha256::new();
    let mut sent = 0;
    while sent < len {
        let chunk: Vec<u8> = (sent..len.min(sent + STREAM_CHUNK_LEN))
            .map(|i| b'a' + (i % 26) as u8)
            .collect();
        hasher.update(&chunk);
        sent += res.write_chunked_body(&chunk).await?;
    }

    let digest = hasher
        .finalize()
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect::<String>();
    let mut trailers = Headers::new();
    trailers.set("X-Content-SHA256", digest)?;
    trailers.set("X-Content-Length", sent.to_string())?;
    res.write_trailers(&trailers).await
}

const OK_PAGE: &str = "<html>
  <head>
    <title>200 OK</title>
  </head>
  <body>
    <h1>Success!</h1>
    <p>Your request was an absolute banger.</p>
  </body>
</html>";

const BAD_REQUEST_PAGE: &str = "<html>
  <head>
    <title>400 Bad Request</title>
  </head>
  <body>
    <h1>Bad Request</h1>
    <p>Your request honestly kinda sucked.</p>
  </body>
</html>";

const SERVER_ERROR_PAGE: &str = "<html>
  <head>
    <title>500 Internal Server Error</title>
  </head>
  <body>
    <h1>Internal Server Error</h1>
    <p>Okay, you know what? This one is on me.</p>
  </body>
</html>";
