use std::collections::HashMap;
use std::env;

use http_call::{ClientConfig, HttpCallClient, HttpClient, Method, ResponseBody, TlsTrustPolicy};

fn main() {
    // init logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();

    // Usage: fetch [URL] [--insecure]
    let mut args = env::args().skip(1);
    let url = args.next().unwrap_or_else(|| "https://www.google.com/".to_string());
    let insecure = args.any(|arg| arg == "--insecure");

    let mut config = ClientConfig::with_timeouts(5_000, 10_000);
    if insecure {
        config = config.tls_trust_policy(TlsTrustPolicy::DangerousAcceptAnyCertificate);
    }
    let client = HttpCallClient::from_config(config);

    let headers = HashMap::from([("User-Agent".to_string(), "http_call-demo/1.0".to_string())]);
    match client.send_request_with_headers(Method::GET, &url, None, "text/html", &headers) {
        Ok(response) => {
            log::info!("status = {}", response.code());
            log::info!("headers = {:?}", response.headers());
            match response.into_body() {
                ResponseBody::Text(text) => log::info!("text body = {} chars", text.len()),
                ResponseBody::Binary(bytes) => log::info!("binary body = {} bytes", bytes.len()),
            }
        }
        Err(e) => log::error!("request failed: {e}"),
    }
}
