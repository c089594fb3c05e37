use std::sync::Arc;

use color_eyre::eyre::Result;

use crate::{
    config::Config,
    llm::{LanguageModel, OllamaClient},
    places::{GooglePlacesClient, PlaceProvider},
};

pub fn language_model(config: &Config) -> Result<Arc<dyn LanguageModel>> {
    Ok(Arc::new(OllamaClient::new(
        &config.llm_url,
        &config.llm_model,
        config.llm_timeout,
    )?))
}

pub fn place_provider(config: &Config) -> Result<Arc<dyn PlaceProvider>> {
    Ok(Arc::new(GooglePlacesClient::new(
        &config.maps_url,
        &config.maps_api_key,
        config.maps_timeout,
    )?))
}
