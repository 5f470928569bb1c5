use http::StatusCode;
use snafu::Snafu;

pub(crate) type StoreResult<T> = std::result::Result<T, StoreError>;

/// Failures talking to the object store, classified by what the reconciler should do about them.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub(crate) enum StoreError {
    #[snafu(display("{} '{}' does not exist: {}", kind, id, source))]
    NotFound {
        kind: String,
        id: String,
        source: kube::Error,
    },

    /// The version token on the object we sent is stale, or the object already exists.
    #[snafu(display("Conflict trying to {} {} '{}': {}", method, kind, id, source))]
    Conflict {
        method: String,
        kind: String,
        id: String,
        source: kube::Error,
    },

    #[snafu(display("Unable to {} {} '{}': {}", method, kind, id, source))]
    Unavailable {
        method: String,
        kind: String,
        id: String,
        source: kube::Error,
    },

    #[snafu(display("Unable to serialize {} '{}': {}", kind, id, source))]
    Serialization {
        kind: String,
        id: String,
        source: serde_json::Error,
    },
}

impl StoreError {
    /// Sort a `kube::Error` into `NotFound` (404), `Conflict` (409) or `Unavailable`.
    pub(crate) fn classify<S1, S2, S3>(e: kube::Error, method: S1, kind: S2, id: S3) -> Self
    where
        S1: Into<String>,
        S2: Into<String>,
        S3: Into<String>,
    {
        if e.is_status_code(StatusCode::NOT_FOUND) {
            StoreError::NotFound {
                kind: kind.into(),
                id: id.into(),
                source: e,
            }
        } else if e.is_status_code(StatusCode::CONFLICT) {
            StoreError::Conflict {
                method: method.into(),
                kind: kind.into(),
                id: id.into(),
                source: e,
            }
        } else {
            StoreError::Unavailable {
                method: method.into(),
                kind: kind.into(),
                id: id.into(),
                source: e,
            }
        }
    }

    pub(crate) fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict { .. })
    }

    pub(crate) fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }
}

pub(crate) trait HttpStatusCode {
    fn status_code(&self) -> Option<StatusCode>;

    fn is_status_code(&self, status_code: StatusCode) -> bool {
        self.status_code()
            .map(|some| some == status_code)
            .unwrap_or_default()
    }
}

impl HttpStatusCode for kube::Error {
    fn status_code(&self) -> Option<StatusCode> {
        if let kube::Error::Api(error_response) = self {
            StatusCode::from_u16(error_response.code).ok()
        } else {
            None
        }
    }
}

/// Build the error the API server returns for `code`. Used by the in-memory store.
#[cfg(test)]
pub(crate) fn api_error(code: u16, reason: &str, message: String) -> kube::Error {
    kube::Error::Api(kube::core::ErrorResponse {
        status: "Failure".to_owned(),
        message,
        reason: reason.to_owned(),
        code,
    })
}

#[test]
fn classify_by_status_code() {
    let not_found = StoreError::classify(
        api_error(404, "NotFound", "gone".into()),
        "get",
        "Secret",
        "bots/x",
    );
    assert!(not_found.is_not_found());
    let conflict = StoreError::classify(
        api_error(409, "Conflict", "stale".into()),
        "replace",
        "Secret",
        "bots/x",
    );
    assert!(conflict.is_conflict());
    let unavailable = StoreError::classify(
        api_error(503, "ServiceUnavailable", "down".into()),
        "get",
        "Secret",
        "bots/x",
    );
    assert!(matches!(unavailable, StoreError::Unavailable { .. }));
}
