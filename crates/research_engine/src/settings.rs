use std::time::Duration;

/// Server endpoints, relative to `base_url` so a path prefix on the base is
/// kept. `{id}` is replaced with the percent-encoded job or conversation
/// identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub create_job: String,
    pub job_status: String,
    pub job_result: String,
    pub history: String,
    pub conversations: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            create_job: "api/deep_research".to_string(),
            job_status: "api/deep_research/status/{id}".to_string(),
            job_result: "api/deep_research/result/{id}".to_string(),
            history: "api/history/{id}".to_string(),
            conversations: "api/conversations".to_string(),
        }
    }
}

impl Endpoints {
    pub(crate) fn with_id(template: &str, id: &str) -> String {
        template.replace("{id}", &urlencoding::encode(id))
    }
}

#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub base_url: String,
    /// Sent as `X-CSRFToken` when present.
    pub csrf_token: Option<String>,
    pub connect_timeout: Duration,
    /// Client-wide bound on every exchange. Unset by default: status polls are
    /// bounded only by the master deadline.
    pub request_timeout: Option<Duration>,
    /// Deadline on the job creation exchange only.
    pub submit_deadline: Option<Duration>,
    /// Deadline on the result fetch, history reload and conversation list
    /// exchanges that follow a completed job.
    pub reconcile_deadline: Option<Duration>,
    pub endpoints: Endpoints,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:5000".to_string(),
            csrf_token: None,
            connect_timeout: Duration::from_secs(10),
            request_timeout: None,
            submit_deadline: Some(Duration::from_secs(30)),
            reconcile_deadline: Some(Duration::from_secs(30)),
            endpoints: Endpoints::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_encoded_as_one_path_segment() {
        let template = Endpoints::default().job_status;
        assert_eq!(
            Endpoints::with_id(&template, "1001"),
            "api/deep_research/status/1001"
        );
        assert_eq!(
            Endpoints::with_id(&template, "a#b/c?d%"),
            "api/deep_research/status/a%23b%2Fc%3Fd%25"
        );
    }
}
