//! Gestion des erreurs pour le client Spotify

use pmocapacity::RemoteError;
use thiserror::Error;

/// Nom du fournisseur tel qu'il apparaît dans les erreurs et les logs
pub(crate) const PROVIDER: &str = "spotify";

/// Type Result personnalisé pour pmospotify
pub type Result<T> = std::result::Result<T, SpotifyError>;

/// Erreurs possibles lors de l'utilisation du client Spotify
#[derive(Error, Debug)]
pub enum SpotifyError {
    /// Token absent, expiré ou sans le scope requis
    #[error("Authentication failed: {0}")]
    Unauthorized(String),

    /// Playlist inconnue
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Erreur HTTP
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Erreur de parsing JSON
    #[error("JSON parsing error: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// Erreur de configuration (anyhow)
    #[error("Configuration error: {0}")]
    Config(#[from] anyhow::Error),

    /// Paramètre Spotify invalide (URL, token...)
    #[error("Spotify configuration error: {0}")]
    Configuration(String),

    /// Erreur de l'API Spotify
    #[error("Spotify API error (code {code}): {message}")]
    ApiError { code: u16, message: String },

    /// Ajout interrompu après l'envoi réussi des premiers lots
    #[error("Append stopped after {applied} tracks: {source}")]
    PartialAppend {
        /// Titres effectivement ajoutés avant l'échec
        applied: usize,
        #[source]
        source: Box<SpotifyError>,
    },

    /// Quota dépassé (rate limiting)
    #[error("Rate limit exceeded, please try again later")]
    RateLimitExceeded {
        /// Délai demandé par le header Retry-After, en secondes
        retry_after: Option<u64>,
    },
}

impl SpotifyError {
    /// Crée une erreur API depuis un code de statut HTTP et un message
    pub fn from_status_code(code: u16, message: impl Into<String>) -> Self {
        match code {
            401 | 403 => Self::Unauthorized(message.into()),
            404 => Self::NotFound(message.into()),
            429 => Self::RateLimitExceeded { retry_after: None },
            _ => Self::ApiError {
                code,
                message: message.into(),
            },
        }
    }

    /// Code HTTP associé à l'erreur, quand il est connu
    pub fn status_code(&self) -> Option<u16> {
        match self {
            SpotifyError::Unauthorized(_) => Some(401),
            SpotifyError::NotFound(_) => Some(404),
            SpotifyError::RateLimitExceeded { .. } => Some(429),
            SpotifyError::ApiError { code, .. } => Some(*code),
            SpotifyError::Http(e) => e.status().map(|s| s.as_u16()),
            SpotifyError::PartialAppend { source, .. } => source.status_code(),
            _ => None,
        }
    }

    /// Vérifie si l'erreur est une erreur de credentials (401/403)
    pub fn is_auth_error(&self) -> bool {
        matches!(self, SpotifyError::Unauthorized(_))
    }

    /// Vérifie si l'erreur est une erreur de rate limiting
    pub fn is_rate_limit(&self) -> bool {
        matches!(self, SpotifyError::RateLimitExceeded { .. })
    }
}

impl From<SpotifyError> for RemoteError {
    fn from(err: SpotifyError) -> Self {
        if let SpotifyError::PartialAppend { applied, source } = err {
            return RemoteError::from(*source).with_applied(applied);
        }

        let status = err.status_code();
        let message = match err {
            SpotifyError::Unauthorized(message)
            | SpotifyError::NotFound(message)
            | SpotifyError::ApiError { message, .. } => message,
            other => other.to_string(),
        };

        let remote = RemoteError::new(PROVIDER, message);
        match status {
            Some(code) => remote.with_status(code),
            None => remote,
        }
    }
}
