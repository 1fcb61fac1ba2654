use actix_web::{middleware, web, App, HttpServer};
use resinet::config::ModelConfig;
use resinet::server::{routes, AppState};
use std::{env, io, process};
use tracing::info;

const USAGE: &str = "usage: ./resinet <port> [model file]";

/// The camera front end posts full-resolution captures as base64 JSON, so the
/// default 256 KiB body limit is far too small
const MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

fn get_args() -> (u16, Option<String>) {
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 || args.len() > 3 {
        println!("{USAGE}");
        process::exit(1);
    }

    let port: u16 = args[1].parse().expect("invalid port");
    let model = args.get(2).cloned();

    (port, model)
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    tracing_subscriber::fmt::init();

    let (port, model_override) = get_args();

    let mut config = ModelConfig::load().expect("invalid configuration");
    if let Some(path) = model_override {
        config.model_path = path;
    }

    info!(
        "serving model {} on port {port}, {} classes at {}x{} input",
        config.model_path, config.n_classes, config.image_size, config.image_size
    );

    let state = web::Data::new(AppState::new(config));

    // Start the HTTP server
    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .app_data(web::PayloadConfig::new(MAX_BODY_BYTES))
            .wrap(middleware::Logger::default())
            .service(routes::predict)
    })
    .bind(format!("0.0.0.0:{port}"))?
    .run()
    .await
}
