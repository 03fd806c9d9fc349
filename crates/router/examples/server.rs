use bytes::Bytes;
use http::StatusCode;
use micro_router::middleware::builtin::{CorsConfig, cors, request_logger};
use micro_router::view::{Request, RequestView, Response, ResponseView};
use micro_router::{Router, RouterConfig, handler_fn};
use serde_json::json;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::{Level, error, info, warn};
use tracing_subscriber::FmtSubscriber;

const MAX_HEADERS: usize = 32;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() {
    let subscriber = FmtSubscriber::builder().with_max_level(Level::INFO).finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let router = match build_router() {
        Ok(router) => Arc::new(router),
        Err(e) => {
            error!(cause = %e, "invalid route table");
            return;
        }
    };

    info!(port = 8080, "start listening");
    let tcp_listener = match TcpListener::bind("127.0.0.1:8080").await {
        Ok(tcp_listener) => tcp_listener,
        Err(e) => {
            error!(cause = %e, "bind server error");
            return;
        }
    };

    loop {
        let (tcp_stream, remote_addr) = match tcp_listener.accept().await {
            Ok(stream_and_addr) => stream_and_addr,
            Err(e) => {
                warn!(cause = %e, "failed to accept");
                continue;
            }
        };

        let router = Arc::clone(&router);
        tokio::spawn(async move {
            if let Err(e) = serve_connection(tcp_stream, remote_addr, &router).await {
                warn!(cause = %e, %remote_addr, "connection error");
            }
        });
    }
}

fn build_router() -> Result<Router, micro_router::PatternError> {
    let config = RouterConfig::default().with_error_log("logs/error.log");
    let mut builder = Router::builder_with(config);
    builder.add_middleware(request_logger());
    builder.add_middleware(cors(CorsConfig::default()));

    builder.get("/", handler_fn(|_req, resp, _params| resp.with_html("<h1>hello world</h1>".into(), StatusCode::OK)))?;
    builder.group("/api", [], |api| {
        api.get("/echo/:word", handler_fn(|req, resp, params| {
            let body = json!({ "word": params.get("word"), "query": req.raw_query() });
            resp.with_json(body, StatusCode::OK);
        }))?;
        api.get("/status", handler_fn(|_req, resp, _params| resp.with_status(StatusCode::OK, Some("ok"))))?;
        Ok(())
    })?;
    Ok(builder.build())
}

async fn serve_connection(mut stream: TcpStream, remote_addr: SocketAddr, router: &Router) -> io::Result<()> {
    let Some(request) = read_request(&mut stream).await? else {
        return Ok(());
    };

    let mut req = Request::from(request).with_remote_addr(remote_addr).with_deadline(Instant::now() + REQUEST_TIMEOUT);
    let mut resp = Response::for_request(&req, router.response_config());
    if router.handle(&mut req, &mut resp).await.is_err() {
        info!(path = req.path(), status = %resp.status(), "request failed");
    }

    write_response(&mut stream, resp.into_http()?).await
}

/// Reads one request, `None` when the peer closed the connection first.
async fn read_request(stream: &mut TcpStream) -> io::Result<Option<http::Request<Bytes>>> {
    let mut buf = Vec::with_capacity(4096);
    loop {
        let mut chunk = [0u8; 4096];
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Ok(None);
        }
        buf.extend_from_slice(&chunk[..n]);

        let mut headers = [httparse::EMPTY_HEADER; MAX_HEADERS];
        let mut parsed = httparse::Request::new(&mut headers);
        let header_len = match parsed.parse(&buf).map_err(io::Error::other)? {
            httparse::Status::Complete(len) => len,
            httparse::Status::Partial => continue,
        };

        let mut builder = http::Request::builder()
            .method(parsed.method.unwrap_or("GET"))
            .uri(parsed.path.unwrap_or("/"));
        let mut content_length = 0;
        for header in parsed.headers.iter() {
            if header.name.eq_ignore_ascii_case("content-length") {
                content_length = std::str::from_utf8(header.value).ok().and_then(|v| v.trim().parse().ok()).unwrap_or(0);
            }
            builder = builder.header(header.name, header.value);
        }

        let mut body = buf.split_off(header_len);
        while body.len() < content_length {
            let n = stream.read(&mut chunk).await?;
            if n == 0 {
                break;
            }
            body.extend_from_slice(&chunk[..n]);
        }
        body.truncate(content_length);

        return builder.body(Bytes::from(body)).map(Some).map_err(io::Error::other);
    }
}

async fn write_response(stream: &mut TcpStream, response: http::Response<Bytes>) -> io::Result<()> {
    let status = response.status();
    let mut head = format!("HTTP/1.1 {} {}\r\n", status.as_u16(), status.canonical_reason().unwrap_or(""));
    for (name, value) in response.headers() {
        head.push_str(&format!("{name}: {}\r\n", String::from_utf8_lossy(value.as_bytes())));
    }
    if !response.headers().contains_key(http::header::CONTENT_LENGTH) {
        head.push_str(&format!("content-length: {}\r\n", response.body().len()));
    }
    head.push_str("connection: close\r\n\r\n");

    stream.write_all(head.as_bytes()).await?;
    stream.write_all(response.body()).await?;
    stream.flush().await
}
