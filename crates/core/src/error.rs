#[derive(Debug, thiserror::Error)]
pub enum EditorError {
    #[error("FHIR error: {0}")]
    Fhir(#[from] fhir::FhirError),

    #[error("required form field is missing: {0}")]
    MissingFormField(String),
    #[error("form field {field} is not a {expected}")]
    WrongFieldKind {
        field: String,
        expected: &'static str,
    },

    #[error("failed to parse terminology fixture: {0}")]
    TerminologyFixture(#[source] serde_json::Error),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("failed to parse configuration YAML: {0}")]
    ConfigYaml(#[from] serde_yaml::Error),
}

pub type EditorResult<T> = std::result::Result<T, EditorError>;
