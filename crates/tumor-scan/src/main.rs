use crate::config::Config;
use crate::labels::LabelMap;
use crate::model::{BurnClassifier, InferenceBackend};
use crate::session::SessionKey;
use crate::state::AppState;
use crate::upload::UploadStore;
use log::{error, info, warn, LevelFilter};
use simple_logger::SimpleLogger;
use std::sync::Arc;
use std::time::SystemTime;

mod config;
mod data;
mod error;
mod history;
mod infer;
mod labels;
mod model;
mod page;
mod routes;
mod session;
mod state;
mod upload;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();
    SimpleLogger::new().with_level(LevelFilter::Info).env().init()?;

    let config = Config::from_env()?;
    info!(
        "Config: host={} port={} model={} model_config={} labels={} static={} max_upload_bytes={}",
        config.host,
        config.port,
        config.model_path.display(),
        config.model_config.display(),
        config.labels_path.display(),
        config.static_dir.display(),
        config.max_upload_bytes
    );
    if config.uses_default_secret() {
        warn!("SECRET_KEY is not set, sessions are signed with the development key");
    }

    let labels = LabelMap::load(&config.labels_path);

    let time = SystemTime::now();
    let classifier = match BurnClassifier::<InferenceBackend>::load(
        &config.model_path,
        &config.model_config,
        &labels,
        Default::default(),
    ) {
        Ok(classifier) => classifier,
        Err(err) => {
            error!("Failed to start application: {}", err);
            return Err(err.into());
        }
    };
    info!("Time to load model: {}", time.elapsed()?.as_millis() as f64 / 1000.0);

    let uploads = UploadStore::new(config.uploads_dir())?;
    info!("Storing uploads in {}", uploads.dir().display());
    let state = AppState::new(Arc::new(classifier), labels, uploads, SessionKey::new(&config.secret_key));
    let app = routes::router(state, &config.static_dir, config.max_upload_bytes);

    let addr = format!("{}:{}", config.host, config.port);
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
