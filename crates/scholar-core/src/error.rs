use http::StatusCode;

/// Contract between domain errors and the network layer
///
/// Chat and provider errors implement this so a gRPC or HTTP front end can
/// render them without depending on their internals.
pub trait HttpError: std::error::Error {
    /// Status code for this error
    fn status_code(&self) -> StatusCode;

    /// Machine-readable error kind (e.g. `unknown_tool`)
    fn error_type(&self) -> &str;

    /// Message safe to return to the caller
    fn client_message(&self) -> String;
}
