use thiserror::Error;

/// Problems in the declared users, resources or route annotations. These are
/// detected before the first request is sent and abort the run.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("user with identifier '{0}' has already been created in this run")]
    DuplicateUser(String),

    #[error("resource '{0}' has been declared more than once")]
    DuplicateResource(String),

    #[error("resource name should not be empty")]
    EmptyResourceName,

    #[error("route {method} '{path}' references unknown resource '{resource}'")]
    UnknownResource {
        method: String,
        path: String,
        resource: String,
    },

    #[error("relationship of user '{user}' references unknown resource '{resource}'")]
    UnknownRelationshipResource { user: String, resource: String },

    #[error(
        "route {method} '{path}' has an incomplete resource annotation: {reason}"
    )]
    IncompleteAnnotation {
        method: String,
        path: String,
        reason: String,
    },

    #[error("route {method} '{path}' uses undeclared security scheme '{scheme}'")]
    UnknownSecurityScheme {
        method: String,
        path: String,
        scheme: String,
    },

    #[error("security scheme '{0}' has been declared more than once")]
    DuplicateSecurityScheme(String),

    #[error("security scheme '{0}' requires an auth endpoint, but none was described")]
    MissingAuthEndpoint(String),
}
