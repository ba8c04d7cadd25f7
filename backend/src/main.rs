use actix_cors::Cors;
use actix_web::{App, HttpServer, web};
use pneumoscan::routes::configure_routes;
use pneumoscan::{AppConfig, Classifier};
use std::env;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));
    dotenv::dotenv().ok();

    if let Ok(current_dir) = env::current_dir() {
        log::info!("Current working directory: {}", current_dir.display());
    }

    let config = AppConfig::load().map_err(|e| {
        log::error!("Invalid configuration: {}", e);
        std::io::Error::other(e)
    })?;

    // No prediction can be served without the model, so a load failure
    // stops startup here.
    let classifier = match Classifier::load(&config.model, config.image.clone()) {
        Ok(classifier) => classifier,
        Err(e) => {
            log::error!("Failed to load model at startup: {}", e);
            return Err(std::io::Error::other(e));
        }
    };

    if let Some(image_path) = env::args().nth(1) {
        return match classifier.predict_pneumonia(&image_path) {
            Ok(prediction) => {
                println!(
                    "Prediction: {} (Confidence: {:.2})",
                    prediction.label, prediction.probability
                );
                Ok(())
            }
            Err(e) => {
                log::error!("Could not analyze {}: {}", image_path, e);
                Err(std::io::Error::other(e))
            }
        };
    }

    let bind_address = config.bind_address();
    let max_upload_bytes = config.server.max_upload_bytes;
    let classifier = web::Data::new(classifier);
    let config = web::Data::new(config);

    log::info!("Starting server on {}", bind_address);

    HttpServer::new(move || {
        App::new()
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allowed_methods(vec!["GET", "POST", "OPTIONS"])
                    .allowed_headers(vec![
                        actix_web::http::header::ACCEPT,
                        actix_web::http::header::CONTENT_TYPE,
                    ])
                    .max_age(3600),
            )
            .app_data(classifier.clone())
            .app_data(config.clone())
            .configure(|cfg| configure_routes(cfg, max_upload_bytes))
    })
    .bind(&bind_address)?
    .run()
    .await
}
