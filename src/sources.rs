//! The list of portals scraped on every run.
//!
//! The built-in list covers major Spanish-language outlets in Spain and the
//! Americas. A YAML file holding a sequence of URLs can replace it:
//!
//! ```yaml
//! - https://elpais.com/
//! - https://www.clarin.com/
//! ```

use crate::error::SourcesError;
use std::path::Path;
use tracing::{info, instrument};
use url::Url;

pub const DEFAULT_SOURCES: [&str; 18] = [
    "https://elpais.com/",
    "https://www.elmundo.es/",
    "https://www.abc.es/",
    "https://www.lavanguardia.com/",
    "https://www.elconfidencial.com/",
    "https://www.elperiodico.com/es/",
    "https://www.clarin.com/",
    "https://www.lanacion.com.ar/",
    "https://www.infobae.com/",
    "https://www.eluniversal.com.mx/",
    "https://www.milenio.com/",
    "https://www.excelsior.com.mx/",
    "https://www.jornada.com.mx/",
    "https://elcomercio.pe/",
    "https://larepublica.pe/",
    "https://www.bbc.com/mundo",
    "https://www.univision.com/",
    "https://www.telemundo.com/",
];

fn parse_all<'a>(urls: impl IntoIterator<Item = &'a str>) -> Result<Vec<Url>, SourcesError> {
    let parsed = urls
        .into_iter()
        .map(|raw| {
            Url::parse(raw.trim()).map_err(|source| SourcesError::InvalidUrl {
                url: raw.to_string(),
                source,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    if parsed.is_empty() {
        return Err(SourcesError::Empty);
    }
    Ok(parsed)
}

/// Parse a YAML sequence of portal URLs.
pub fn parse_sources_yaml(text: &str) -> Result<Vec<Url>, SourcesError> {
    let raw: Vec<String> = serde_yaml::from_str(text)?;
    parse_all(raw.iter().map(String::as_str))
}

/// Load the sources file if one was given, otherwise the built-in list.
#[instrument(level = "info")]
pub async fn load_sources(path: Option<&Path>) -> Result<Vec<Url>, SourcesError> {
    let sources = match path {
        Some(path) => {
            let text = tokio::fs::read_to_string(path)
                .await
                .map_err(|source| SourcesError::Read {
                    path: path.to_path_buf(),
                    source,
                })?;
            parse_sources_yaml(&text)?
        }
        None => parse_all(DEFAULT_SOURCES)?,
    };
    info!(count = sources.len(), "Loaded news sources");
    Ok(sources)
}
