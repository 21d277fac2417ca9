use std::sync::Arc;

use tracing::info;

use crate::clients::{LanguageModel, create_model};
use crate::config::Config;
use crate::error::Result;
use crate::server::AbleMindServer;
use crate::store::SurrealStore;

impl AbleMindServer {
    /// Connect the SurrealDB store and build the model handle
    pub async fn connect(config: Config) -> Result<Self> {
        let model = create_model(&config)?;
        let store = SurrealStore::connect(&config).await?;
        info!(
            "AbleMind server ready: model {}, {} challenges per run",
            model.name(),
            config.assessment.total_challenges
        );
        Ok(Self::new(Arc::new(config), model, Arc::new(store)))
    }
}
