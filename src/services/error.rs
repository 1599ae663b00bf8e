//! Error type shared by the service layer

/// Failure of a service operation.
///
/// Each domain variant maps onto one HTTP status at the API edge;
/// `Internal` wraps repository, cache and I/O failures.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotAcceptable(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl ServiceError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized(message.into())
    }
}

/// Whether `err` is a unique constraint rejecting a write.
pub fn is_unique_violation(err: &anyhow::Error) -> bool {
    matches!(
        err.downcast_ref::<sqlx::Error>(),
        Some(sqlx::Error::Database(db)) if db.is_unique_violation()
    )
}

/// Map a failed insert or update.
///
/// A unique violation means a concurrent write won the race past the
/// service's own check and becomes `Conflict(conflict)`; anything else is
/// internal, with `context` attached.
pub fn write_error(err: anyhow::Error, context: &'static str, conflict: &str) -> ServiceError {
    if is_unique_violation(&err) {
        ServiceError::conflict(conflict)
    } else {
        ServiceError::Internal(err.context(context))
    }
}

/// Trim `value` and reject it when nothing is left.
pub fn required(field: &str, value: &str) -> Result<String, ServiceError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ServiceError::bad_request(format!("{} is required", field)));
    }
    Ok(trimmed.to_string())
}

/// Like [`required`], for the optional fields of partial updates.
pub fn required_if_present(field: &str, value: Option<&str>) -> Result<Option<String>, ServiceError> {
    value.map(|v| required(field, v)).transpose()
}

/// Loose shape check: one `@` with a dotted domain after it.
pub fn validate_email(email: &str) -> Result<String, ServiceError> {
    let email = required("email", email)?.to_lowercase();
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    };
    if !valid {
        return Err(ServiceError::bad_request(format!("Invalid email address: {}", email)));
    }
    Ok(email)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_required_trims() {
        assert_eq!(required("name", "  Lan  ").unwrap(), "Lan");
        assert!(matches!(required("name", "   "), Err(ServiceError::BadRequest(_))));
    }

    #[test]
    fn test_required_if_present() {
        assert_eq!(required_if_present("name", None).unwrap(), None);
        assert_eq!(required_if_present("name", Some(" a ")).unwrap().as_deref(), Some("a"));
        assert!(required_if_present("name", Some("")).is_err());
    }

    #[test]
    fn test_validate_email() {
        assert_eq!(validate_email(" Hr@Example.COM ").unwrap(), "hr@example.com");
        for bad in ["", "plain", "@example.com", "a@b", "a@.com", "a@b.com.", "a@b@c.com"] {
            assert!(validate_email(bad).is_err(), "{} should be rejected", bad);
        }
    }

    #[tokio::test]
    async fn test_write_error_maps_unique_violation() {
        use crate::db::repositories::{SqlxTagRepository, TagRepository};
        use crate::db::{create_test_pool, migrations};
        use crate::models::Tag;

        let pool = create_test_pool().await.unwrap();
        migrations::run_migrations(&pool).await.unwrap();
        let tags = SqlxTagRepository::new(pool);
        tags.create(&Tag::new("Lúa".into(), "米".into())).await.unwrap();

        let err = tags
            .create(&Tag::new("Lúa".into(), "米".into()))
            .await
            .unwrap_err();
        assert!(is_unique_violation(&err));
        assert!(matches!(
            write_error(err, "Failed to create tag", "taken"),
            ServiceError::Conflict(m) if m == "taken"
        ));

        let other = write_error(anyhow::anyhow!("disk full"), "Failed to create tag", "taken");
        assert!(matches!(other, ServiceError::Internal(_)));
    }

    proptest! {
        #[test]
        fn required_never_returns_surrounding_whitespace(s in "\\PC{0,20}") {
            if let Ok(v) = required("f", &s) {
                prop_assert_eq!(v.trim(), v.as_str());
                prop_assert!(!v.is_empty());
            }
        }
    }
}
