#[macro_use]
extern crate rocket;

use log::info;
use rocket::fairing::AdHoc;
use std::env;
use std::sync::Arc;

use alphabeta_snake::bot::Bot;
use alphabeta_snake::config::Config;
use alphabeta_snake::debug_logger::DebugLogger;
use alphabeta_snake::zobrist::ZobristTable;

mod handler;

#[launch]
fn rocket() -> _ {
    // Hosting services usually hand us the port in `PORT`; Rocket reads `ROCKET_PORT`
    if let Ok(port) = env::var("PORT") {
        env::set_var("ROCKET_PORT", &port);
    }

    // Default to 'info' unless `RUST_LOG` says otherwise
    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "info");
    }

    env_logger::init();

    info!("Starting Battlesnake Server...");

    let config = Config::load_or_default();

    // One key table for the whole process, shared by every decision
    let zobrist = Arc::new(ZobristTable::from_config(&config.zobrist));
    info!(
        "Zobrist table ready for boards up to {}x{}",
        config.zobrist.max_width, config.zobrist.max_height
    );

    let debug_logger = DebugLogger::new(config.debug.enabled, &config.debug.log_file_path);
    let bot = Bot::new(config, zobrist).with_debug_logger(debug_logger);

    rocket::build()
        .manage(bot)
        .attach(AdHoc::on_response("Server ID Middleware", |_, res| {
            Box::pin(async move {
                res.set_raw_header("Server", "battlesnake/alphabeta-snake");
            })
        }))
        .mount(
            "/",
            routes![handler::index, handler::start, handler::get_move, handler::end],
        )
}
