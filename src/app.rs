use crate::config::Config;
use crate::errors::ToolError;
use crate::managers::rest::RestManager;
use crate::services::logger::Logger;
use std::sync::Arc;

pub struct App {
    pub logger: Logger,
    pub config: Arc<Config>,
    pub rest_manager: RestManager,
}

impl App {
    pub fn initialize() -> Result<Self, ToolError> {
        let logger = Logger::new("restcheck");
        let config = Arc::new(Config::from_env()?);
        logger.info(
            "Configuration loaded",
            Some(&serde_json::json!({
                "baseUrl": config.base_url,
                "sslVerify": config.ssl_verify,
                "authMethod": config.auth.label(),
            })),
        );
        let rest_manager = RestManager::new(logger.clone(), config.clone())?;
        Ok(Self {
            logger,
            config,
            rest_manager,
        })
    }
}
